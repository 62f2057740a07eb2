//! Proximity evaluation: one location fix plus the active-target snapshot in,
//! edge-triggered transitions and a status summary out.

use tracing::debug;
use uuid::Uuid;

use crate::models::{
    LocationFix, MalformedTarget, MotionState, NearestTarget, Target, TrackingStatus, Transition,
    TransitionKind,
};
use crate::services::containment::ContainmentTracker;
use shared::geodesy::distance_meters;

/// Minimum time between two alerts for the same target.
pub const DEFAULT_ALERT_COOLDOWN_MS: i64 = 5 * 60 * 1000;

/// Speed above which the device is shown as moving.
pub const DEFAULT_MOVING_SPEED_THRESHOLD_MPS: f64 = 0.5;

/// Tunable evaluation policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatorPolicy {
    pub alert_cooldown_ms: i64,
    pub moving_speed_threshold_mps: f64,
}

impl Default for EvaluatorPolicy {
    fn default() -> Self {
        Self {
            alert_cooldown_ms: DEFAULT_ALERT_COOLDOWN_MS,
            moving_speed_threshold_mps: DEFAULT_MOVING_SPEED_THRESHOLD_MPS,
        }
    }
}

/// Result of evaluating a single fix.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub transitions: Vec<Transition>,
    pub nearest: Option<NearestTarget>,
    /// `None` when no target was evaluated.
    pub motion: Option<MotionState>,
    /// Targets excluded because they failed the integrity check.
    pub rejected: Vec<(Uuid, MalformedTarget)>,
    /// Number of active, well-formed targets that were evaluated.
    pub evaluated: usize,
}

impl Evaluation {
    /// The status summary this evaluation should publish.
    pub fn status(&self, fix_timestamp: i64) -> TrackingStatus {
        match &self.nearest {
            Some(nearest) => TrackingStatus::tracking(
                nearest.clone(),
                self.motion.unwrap_or(MotionState::Stationary),
                fix_timestamp,
            ),
            None => TrackingStatus::no_targets().at_fix(fix_timestamp),
        }
    }
}

/// Stateless evaluator; containment state lives in the [`ContainmentTracker`].
#[derive(Debug, Clone, Default)]
pub struct ProximityEvaluator {
    policy: EvaluatorPolicy,
}

impl ProximityEvaluator {
    pub fn new(policy: EvaluatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EvaluatorPolicy {
        &self.policy
    }

    /// Whether an alert for `target` may fire at `now` (epoch millis).
    pub fn alert_allowed(&self, target: &Target, now: i64) -> bool {
        !target.has_triggered() || now - target.last_triggered > self.policy.alert_cooldown_ms
    }

    /// Evaluates `fix` against `targets`, updating `tracker` for every
    /// transition found.
    ///
    /// Inactive and malformed targets are skipped and their tracker entries
    /// released, so a later reactivation starts from "outside". A problem with
    /// one target never prevents the others from being evaluated.
    pub fn evaluate(
        &self,
        fix: &LocationFix,
        targets: &[Target],
        tracker: &mut ContainmentTracker,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for target in targets {
            if !target.is_active {
                tracker.remove(target.id);
                continue;
            }

            if let Err(problem) = target.check_integrity() {
                tracker.remove(target.id);
                evaluation.rejected.push((target.id, problem));
                continue;
            }

            let distance = distance_meters(fix.position(), target.center());
            if !distance.is_finite() {
                debug!(target_id = %target.id, "Skipping target, distance is not finite");
                continue;
            }
            evaluation.evaluated += 1;

            let within_radius = distance <= f64::from(target.radius_meters);
            let was_inside = tracker.is_inside(target.id);

            let kind = match (within_radius, was_inside) {
                (true, false) => Some(TransitionKind::Enter),
                (false, true) => Some(TransitionKind::Exit),
                _ => None,
            };

            if let Some(kind) = kind {
                evaluation.transitions.push(Transition {
                    target_id: target.id,
                    target_name: target.name.clone(),
                    kind,
                    distance_meters: distance,
                    timestamp: fix.timestamp,
                    fires_alert: kind == TransitionKind::Enter
                        && self.alert_allowed(target, fix.timestamp),
                });
            }
            tracker.set_inside(target.id, within_radius);

            let closer = evaluation
                .nearest
                .as_ref()
                .map_or(true, |nearest| distance < nearest.distance_meters);
            if closer {
                evaluation.nearest = Some(NearestTarget::new(target.id, &target.name, distance));
            }
        }

        if evaluation.evaluated > 0 {
            evaluation.motion = Some(MotionState::classify(
                fix.speed_meters_per_second,
                self.policy.moving_speed_threshold_mps,
            ));
        }

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{fix_north, target_at_origin, T0};
    use fake::Fake;

    fn evaluator() -> ProximityEvaluator {
        ProximityEvaluator::default()
    }

    /// Mirrors what the monitoring loop does after an alert fires.
    fn record_alerts(evaluation: &Evaluation, targets: &mut [Target]) {
        for transition in evaluation.transitions.iter().filter(|t| t.fires_alert) {
            if let Some(target) = targets.iter_mut().find(|t| t.id == transition.target_id) {
                target.last_triggered = transition.timestamp;
            }
        }
    }

    #[test]
    fn test_single_target_lifecycle() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let mut targets = vec![target_at_origin("A", 50)];

        // Fix1: 100 m away, outside
        let e = evaluator.evaluate(&fix_north(100.0, T0), &targets, &mut tracker);
        assert!(e.transitions.is_empty());

        // Fix2: 10 m, ENTER with alert
        let e = evaluator.evaluate(&fix_north(10.0, T0 + 10_000), &targets, &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert_eq!(e.transitions[0].kind, TransitionKind::Enter);
        assert!(e.transitions[0].fires_alert);
        record_alerts(&e, &mut targets);
        assert_eq!(targets[0].last_triggered, T0 + 10_000);

        // Fix3: 20 m, still inside
        let e = evaluator.evaluate(&fix_north(20.0, T0 + 20_000), &targets, &mut tracker);
        assert!(e.transitions.is_empty());

        // Fix4: 80 m, EXIT
        let e = evaluator.evaluate(&fix_north(80.0, T0 + 30_000), &targets, &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert_eq!(e.transitions[0].kind, TransitionKind::Exit);
        assert!(!e.transitions[0].fires_alert);

        // Fix5: 10 m within a minute of Fix2, ENTER but alert suppressed
        let e = evaluator.evaluate(&fix_north(10.0, T0 + 60_000), &targets, &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert_eq!(e.transitions[0].kind, TransitionKind::Enter);
        assert!(!e.transitions[0].fires_alert);
        record_alerts(&e, &mut targets);
        assert_eq!(targets[0].last_triggered, T0 + 10_000);
    }

    #[test]
    fn test_two_overlapping_targets_enter_together() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let mut a = target_at_origin("A", 100);
        let b = target_at_origin("B", 200);
        // A alerted recently, B never
        a.last_triggered = T0 - 60_000;
        let targets = vec![a, b];

        let e = evaluator.evaluate(&fix_north(50.0, T0), &targets, &mut tracker);

        assert_eq!(e.transitions.len(), 2);
        assert!(e.transitions.iter().all(|t| t.kind == TransitionKind::Enter));
        let alert_a = e.transitions.iter().find(|t| t.target_name == "A").unwrap();
        let alert_b = e.transitions.iter().find(|t| t.target_name == "B").unwrap();
        assert!(!alert_a.fires_alert);
        assert!(alert_b.fires_alert);
    }

    #[test]
    fn test_cooldown_gates_alert_not_transition() {
        let evaluator = evaluator();

        let mut recent = target_at_origin("Recent", 50);
        recent.last_triggered = T0 - 100_000;
        let mut tracker = ContainmentTracker::new();
        let e = evaluator.evaluate(&fix_north(10.0, T0), &[recent], &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert_eq!(e.transitions[0].kind, TransitionKind::Enter);
        assert!(!e.transitions[0].fires_alert);

        let mut old = target_at_origin("Old", 50);
        old.last_triggered = T0 - 400_000;
        let mut tracker = ContainmentTracker::new();
        let e = evaluator.evaluate(&fix_north(10.0, T0), &[old], &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert!(e.transitions[0].fires_alert);
    }

    #[test]
    fn test_cooldown_boundary_is_exclusive() {
        let evaluator = evaluator();
        let mut target = target_at_origin("Edge", 50);
        target.last_triggered = T0 - DEFAULT_ALERT_COOLDOWN_MS;
        assert!(!evaluator.alert_allowed(&target, T0));
        assert!(evaluator.alert_allowed(&target, T0 + 1));
    }

    #[test]
    fn test_inactive_targets_are_invisible() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let mut target = target_at_origin("Off", 500);
        target.is_active = false;

        let e = evaluator.evaluate(&fix_north(1.0, T0), &[target.clone()], &mut tracker);

        assert!(e.transitions.is_empty());
        assert!(e.nearest.is_none());
        assert!(!tracker.is_tracked(target.id));
    }

    #[test]
    fn test_deactivated_target_restarts_from_outside() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let mut target = target_at_origin("Toggle", 50);

        let e = evaluator.evaluate(&fix_north(5.0, T0), &[target.clone()], &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert!(tracker.is_inside(target.id));

        target.is_active = false;
        evaluator.evaluate(&fix_north(5.0, T0 + 1000), &[target.clone()], &mut tracker);
        assert!(!tracker.is_tracked(target.id));

        target.is_active = true;
        let e = evaluator.evaluate(&fix_north(5.0, T0 + 2000), &[target], &mut tracker);
        assert_eq!(e.transitions.len(), 1);
        assert_eq!(e.transitions[0].kind, TransitionKind::Enter);
    }

    #[test]
    fn test_malformed_target_is_isolated() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let broken = target_at_origin("Broken", 0);
        let good = target_at_origin("Good", 50);

        let e = evaluator.evaluate(
            &fix_north(10.0, T0),
            &[broken.clone(), good.clone()],
            &mut tracker,
        );

        assert_eq!(e.rejected.len(), 1);
        assert_eq!(e.rejected[0].0, broken.id);
        assert_eq!(e.rejected[0].1, MalformedTarget::NonPositiveRadius(0));
        assert_eq!(e.transitions.len(), 1);
        assert_eq!(e.transitions[0].target_id, good.id);
        assert_eq!(e.evaluated, 1);
    }

    #[test]
    fn test_zero_active_targets() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let e = evaluator.evaluate(&fix_north(10.0, T0).with_speed(3.0), &[], &mut tracker);
        assert!(e.transitions.is_empty());
        assert!(e.nearest.is_none());
        assert!(e.motion.is_none());
        assert_eq!(e.status(T0).summary, "no active targets");
    }

    #[test]
    fn test_nearest_target_and_motion() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let near = target_at_origin("Near", 10);
        let mut far = target_at_origin("Far", 10);
        far.latitude = 0.02; // ~2.2 km north

        let e = evaluator.evaluate(
            &fix_north(300.0, T0).with_speed(1.2),
            &[far, near],
            &mut tracker,
        );

        let nearest = e.nearest.clone().unwrap();
        assert_eq!(nearest.name, "Near");
        assert_eq!(nearest.distance_label, "300 m");
        assert_eq!(e.motion, Some(MotionState::Moving));
        assert_eq!(e.status(T0).summary, "Near · 300 m · moving");
    }

    #[test]
    fn test_fix_at_center_is_inside() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let target = target_at_origin("Exact", 50);
        let e = evaluator.evaluate(&LocationFix::new(0.0, 0.0, T0), &[target], &mut tracker);
        assert_eq!(e.transitions.len(), 1);
    }

    #[test]
    fn test_edge_triggering_over_random_walk() {
        let evaluator = evaluator();
        let mut tracker = ContainmentTracker::new();
        let target = target_at_origin("Walk", 50);
        let mut inside = false;

        for step in 0..200 {
            let meters: f64 = (0.0..120.0).fake();
            let e = evaluator.evaluate(
                &fix_north(meters, T0 + step * 1000),
                &[target.clone()],
                &mut tracker,
            );
            let now_inside = meters <= 49.0;
            let now_outside = meters >= 51.0;
            match e.transitions.first().map(|t| t.kind) {
                Some(TransitionKind::Enter) => {
                    assert!(!inside, "ENTER while already inside");
                    inside = true;
                }
                Some(TransitionKind::Exit) => {
                    assert!(inside, "EXIT while already outside");
                    inside = false;
                }
                None => {
                    assert!(!(now_inside && !inside), "missed ENTER at {meters} m");
                    assert!(!(now_outside && inside), "missed EXIT at {meters} m");
                }
            }
            assert!(e.transitions.len() <= 1);
            assert_eq!(tracker.is_inside(target.id), inside);
        }
    }
}
