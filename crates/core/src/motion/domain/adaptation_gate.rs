use std::time::{Duration, Instant};

use ndarray::Array2;

use super::background_model::BackgroundModel;

/// Default blend weight for one background accumulation.
pub const DEFAULT_ALPHA: f32 = 0.01;

/// Default quiet period after the last positive detection before the
/// background may learn again.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Time-gated permission to fold the current frame into the background.
///
/// While a face was seen recently the scene is not updated, so a person
/// standing still is never absorbed into the background estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundAdaptationGate {
    cooldown: Duration,
    alpha: f32,
}

impl BackgroundAdaptationGate {
    pub fn new(cooldown: Duration, alpha: f32) -> Self {
        Self { cooldown, alpha }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Blends `current` into `model` when strictly more than `cooldown` has
    /// elapsed since `last_positive`. Returns whether the model changed.
    pub fn maybe_adapt(
        &self,
        model: &mut BackgroundModel,
        current: &Array2<u8>,
        last_positive: Instant,
        now: Instant,
    ) -> bool {
        if now.saturating_duration_since(last_positive) > self.cooldown {
            model.accumulate(current, self.alpha);
            true
        } else {
            false
        }
    }
}

impl Default for BackgroundAdaptationGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn model() -> BackgroundModel {
        BackgroundModel::new(&Array2::from_elem((4, 4), 50u8))
    }

    #[rstest]
    #[case::within_cooldown(3_000, false)]
    #[case::exactly_at_cooldown(5_000, false)]
    #[case::past_cooldown(5_001, true)]
    fn test_gate_respects_cooldown(#[case] elapsed_ms: u64, #[case] expected: bool) {
        let gate = BackgroundAdaptationGate::default();
        let mut bg = model();
        let before = bg.average().clone();
        let t0 = Instant::now();
        let current = Array2::from_elem((4, 4), 250u8);

        let adapted = gate.maybe_adapt(&mut bg, &current, t0, t0 + Duration::from_millis(elapsed_ms));

        assert_eq!(adapted, expected);
        assert_eq!(bg.average() != &before, expected);
    }

    #[test]
    fn test_last_positive_in_future_never_adapts() {
        let gate = BackgroundAdaptationGate::default();
        let mut bg = model();
        let now = Instant::now();
        let current = Array2::from_elem((4, 4), 0u8);
        assert!(!gate.maybe_adapt(&mut bg, &current, now + Duration::from_secs(60), now));
    }

    #[test]
    fn test_custom_alpha_is_used() {
        let gate = BackgroundAdaptationGate::new(Duration::ZERO, 0.5);
        let mut bg = model();
        let t0 = Instant::now();
        gate.maybe_adapt(&mut bg, &Array2::from_elem((4, 4), 150u8), t0, t0 + Duration::from_millis(1));
        assert_eq!(bg.render()[[0, 0]], 100);
    }
}
