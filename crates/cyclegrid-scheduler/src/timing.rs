//! Start offsets that line up a cycle's completions.
//!
//! All four groups are dispatched at the same instant `t0`. Each one is
//! told to wait a different delay so that, given its own duration, the
//! completions land one `step` apart:
//!
//! ```text
//! stage          start                       finish
//! drain          S - D - step                S - step
//! stabilize-1    0                           S
//! replenish      S - R + step                S + step
//! stabilize-2    2 * step                    S + 2 * step
//! ```
//!
//! `S`, `D` and `R` are the stabilize, drain and replenish durations.
//! If a start would be negative every start is shifted by the same
//! amount, which keeps the completion gaps intact.
//!
//! Nothing acknowledges completion. Ordering holds only while the
//! dispatch and scheduling jitter of the launched work stays below
//! `step`, so `step` is the tunable safety margin.

use std::time::Duration;

use cyclegrid_core::{BatchStage, TargetState};
use serde::{Deserialize, Serialize};

/// Start and finish of one stage, relative to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub start: Duration,
    pub finish: Duration,
}

/// Offsets for all four stages of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTiming {
    pub step: Duration,
    pub drain: StageTiming,
    pub stabilize_first: StageTiming,
    pub replenish: StageTiming,
    pub stabilize_second: StageTiming,
}

impl CycleTiming {
    pub fn compute(
        drain: Duration,
        replenish: Duration,
        stabilize: Duration,
        step: Duration,
    ) -> Self {
        let d = nanos(drain);
        let r = nanos(replenish);
        let s = nanos(stabilize);
        let st = nanos(step);

        let starts = [
            (s - d - st, d),
            (0, s),
            (s - r + st, r),
            (2 * st, s),
        ];
        let shift = starts.iter().map(|(start, _)| *start).min().unwrap_or(0).min(0).abs();

        let [drain, stabilize_first, replenish, stabilize_second] =
            starts.map(|(start, len)| StageTiming {
                start: duration(start + shift),
                finish: duration(start + shift + len),
            });

        Self {
            step,
            drain,
            stabilize_first,
            replenish,
            stabilize_second,
        }
    }

    /// Offsets from the durations currently reported by a target.
    pub fn for_target(target: &TargetState, step: Duration) -> Self {
        Self::compute(
            target.drain_time,
            target.replenish_time,
            target.stabilize_time,
            step,
        )
    }

    pub fn stage(&self, stage: BatchStage) -> StageTiming {
        match stage {
            BatchStage::Drain => self.drain,
            BatchStage::StabilizeFirst => self.stabilize_first,
            BatchStage::Replenish => self.replenish,
            BatchStage::StabilizeSecond => self.stabilize_second,
        }
    }

    pub fn offset(&self, stage: BatchStage) -> Duration {
        self.stage(stage).start
    }

    pub fn finish(&self, stage: BatchStage) -> Duration {
        self.stage(stage).finish
    }

    /// Dispatch to last completion.
    pub fn span(&self) -> Duration {
        BatchStage::FINISH_ORDER
            .iter()
            .map(|s| self.finish(*s))
            .max()
            .unwrap_or_default()
    }
}

fn nanos(d: Duration) -> i128 {
    i128::try_from(d.as_nanos()).unwrap_or(i128::MAX / 4)
}

fn duration(nanos: i128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos.max(0)).unwrap_or(u64::MAX))
}
