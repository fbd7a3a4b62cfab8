//! Unit requirements for a cycle and for prep.

use cyclegrid_core::{TargetState, UnitRequirements};

use crate::backend::CostModel;

/// Units for one drain cycle, assuming the target sits at baseline.
///
/// Drain rounds down so it never takes more than `drain_percent`; the
/// replenish multiplier is computed from the full drained amount and
/// rounds up, so the cycle always restores at least what it removed.
pub fn cycle_requirements<C>(
    costs: &C,
    target: &TargetState,
    drain_percent: f64,
) -> UnitRequirements
where
    C: CostModel + ?Sized,
{
    let amount = target.max_resource * drain_percent;
    let drain = costs.drain_units(target, amount).floor().max(0.0) as u64;
    let stabilize_first = costs.stabilize_units(costs.drain_penalty(drain));

    let multiplier = target.max_resource / (target.max_resource - amount).max(1.0);
    let replenish = costs.replenish_units(target, multiplier).ceil().max(0.0) as u64;
    let stabilize_second = costs.stabilize_units(costs.replenish_penalty(replenish));

    UnitRequirements {
        drain,
        stabilize_first,
        replenish,
        stabilize_second,
    }
}

/// Units to bring a target back to baseline, or `None` if it is already there.
pub fn prep_requirements<C>(costs: &C, target: &TargetState) -> Option<UnitRequirements>
where
    C: CostModel + ?Sized,
{
    if target.is_at_baseline() {
        return None;
    }

    let stabilize_first = costs.stabilize_units(target.penalty_excess());
    let (replenish, stabilize_second) = if target.at_max_resource() {
        (0, 0)
    } else {
        let multiplier = target.max_resource / target.resource.max(1.0);
        let replenish = costs.replenish_units(target, multiplier).ceil().max(0.0) as u64;
        (replenish, costs.stabilize_units(costs.replenish_penalty(replenish)))
    };

    Some(UnitRequirements {
        drain: 0,
        stabilize_first,
        replenish,
        stabilize_second,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Linear costs that are easy to check by hand.
    struct FlatCosts;

    impl CostModel for FlatCosts {
        fn drain_units(&self, _target: &TargetState, amount: f64) -> f64 {
            amount / 10.0
        }
        fn drain_penalty(&self, units: u64) -> f64 {
            units as f64 * 0.002
        }
        fn replenish_units(&self, _target: &TargetState, multiplier: f64) -> f64 {
            (multiplier - 1.0) * 100.0
        }
        fn replenish_penalty(&self, units: u64) -> f64 {
            units as f64 * 0.004
        }
        fn stabilize_units(&self, penalty: f64) -> u64 {
            (penalty / 0.05).ceil() as u64
        }
    }

    fn target(penalty: f64, resource: f64) -> TargetState {
        TargetState {
            id: "joesguns".to_string(),
            penalty,
            min_penalty: 5.0,
            resource,
            max_resource: 1000.0,
            drain_time: Duration::from_millis(1000),
            replenish_time: Duration::from_millis(3200),
            stabilize_time: Duration::from_millis(4000),
        }
    }

    #[test]
    fn cycle_requirements_follow_cost_model() {
        let req = cycle_requirements(&FlatCosts, &target(5.0, 1000.0), 0.5);

        // 500 drained at 10 per unit.
        assert_eq!(req.drain, 50);
        // 50 * 0.002 = 0.1 penalty → 2 stabilize units.
        assert_eq!(req.stabilize_first, 2);
        // multiplier 2.0 → 100 units, 0.4 penalty → 8 stabilize units.
        assert_eq!(req.replenish, 100);
        assert_eq!(req.stabilize_second, 8);
    }

    #[test]
    fn drain_rounds_down() {
        let req = cycle_requirements(&FlatCosts, &target(5.0, 1000.0), 0.155);
        assert_eq!(req.drain, 15);
    }

    #[test]
    fn full_drain_caps_denominator() {
        let req = cycle_requirements(&FlatCosts, &target(5.0, 1000.0), 1.0);
        // max / max(0, 1) = 1000x growth.
        assert_eq!(req.replenish, 99_900);
    }

    #[test]
    fn prep_is_noop_at_baseline() {
        assert_eq!(prep_requirements(&FlatCosts, &target(5.0, 1000.0)), None);
    }

    #[test]
    fn prep_only_stabilizes_when_resource_full() {
        let req = prep_requirements(&FlatCosts, &target(6.0, 1000.0)).unwrap();
        assert_eq!(req, UnitRequirements::new(0, 20, 0, 0));
    }

    #[test]
    fn prep_replenishes_and_covers_its_penalty() {
        let req = prep_requirements(&FlatCosts, &target(5.0, 500.0)).unwrap();
        assert_eq!(req.drain, 0);
        assert_eq!(req.stabilize_first, 0);
        assert_eq!(req.replenish, 100);
        assert_eq!(req.stabilize_second, 8);
    }

    #[test]
    fn prep_from_empty_resource_uses_floor_of_one() {
        let req = prep_requirements(&FlatCosts, &target(5.0, 0.0)).unwrap();
        assert_eq!(req.replenish, 99_900);
    }
}
