use std::time::Instant;

/// Animation clock scaled by the configured `time_scale`.
///
/// Each frame advances the clock by the real elapsed wall time multiplied by
/// the scale, so perceived speed is independent of the display refresh rate.
/// A scale of zero freezes the clock entirely, which is how a reduced-motion
/// preference is honoured. Time is accumulated in `f64` to avoid visible
/// quantisation over long sessions.
#[derive(Debug, Clone)]
pub(crate) struct FieldClock {
    time: f64,
    time_scale: f32,
    last_tick: Option<Instant>,
}

impl FieldClock {
    pub fn new(time_scale: f32) -> Self {
        Self {
            time: 0.0,
            time_scale: time_scale.max(0.0),
            last_tick: None,
        }
    }

    /// Advances the clock to `now` and returns the new animation time.
    ///
    /// The first tick establishes the baseline and does not advance time.
    pub fn advance(&mut self, now: Instant) -> f32 {
        if let Some(last) = self.last_tick {
            let delta = now.saturating_duration_since(last).as_secs_f64();
            self.time += delta * f64::from(self.time_scale);
        }
        self.last_tick = Some(now);
        self.time as f32
    }

    /// Current animation time without advancing the clock.
    pub fn time(&self) -> f32 {
        self.time as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_tick_establishes_baseline_without_advancing() {
        let mut clock = FieldClock::new(1.0);
        let t = clock.advance(Instant::now());
        assert_eq!(t, 0.0);
    }

    #[test]
    fn advance_scales_elapsed_wall_time() {
        let mut clock = FieldClock::new(0.5);
        let start = Instant::now();
        clock.advance(start);
        let t = clock.advance(start + Duration::from_secs(2));
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_scale_freezes_the_clock() {
        let mut clock = FieldClock::new(0.0);
        let start = Instant::now();
        clock.advance(start);
        for step in 1..100u64 {
            let t = clock.advance(start + Duration::from_millis(step * 16));
            assert_eq!(t, 0.0);
        }
        assert_eq!(clock.time(), 0.0);
    }

    #[test]
    fn time_is_monotonic_for_non_negative_scales() {
        let mut clock = FieldClock::new(2.0);
        let start = Instant::now();
        let mut last = clock.advance(start);
        for step in 1..50u64 {
            let t = clock.advance(start + Duration::from_millis(step * 7));
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn negative_scale_is_clamped_to_zero() {
        let mut clock = FieldClock::new(-1.0);
        let start = Instant::now();
        clock.advance(start);
        let t = clock.advance(start + Duration::from_secs(1));
        assert_eq!(t, 0.0);
    }
}
