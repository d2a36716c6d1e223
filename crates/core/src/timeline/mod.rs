use std::cell::Cell;

/// Source of absolute time in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Clock whose value is set by hand. Useful for tests and for hosts that
/// already own a frame timer.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: Cell<f64>,
}

impl ManualClock {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds: Cell::new(seconds),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.seconds.set(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.seconds.get()
    }
}

/// The scheduler's advancing reference time.
///
/// Only [`TimeFront::reset`] moves it backwards; deltas and clock samples can
/// only hold or advance it. While paused it holds regardless of input.
#[derive(Debug, Clone)]
pub struct TimeFront {
    seconds: f64,
    scroll_speed: f64,
    sample_scale: f64,
    paused: bool,
}

impl Default for TimeFront {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl TimeFront {
    pub fn new(scroll_speed: f64, sample_scale: f64) -> Self {
        Self {
            seconds: 0.0,
            scroll_speed,
            sample_scale,
            paused: false,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn scroll_speed(&self) -> f64 {
        self.scroll_speed
    }

    /// Replaces the delta multiplier. Negative or non-finite speeds are
    /// ignored. Returns the speed in effect.
    pub fn set_scroll_speed(&mut self, speed: f64) -> f64 {
        if speed.is_finite() && speed >= 0.0 {
            self.scroll_speed = speed;
        }
        self.scroll_speed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn reset(&mut self) {
        self.seconds = 0.0;
    }

    /// Advances by a tick delta scaled by the scroll speed. Negative or
    /// non-finite deltas leave the front where it is.
    pub fn advance(&mut self, delta: f64) -> f64 {
        if self.paused {
            return self.seconds;
        }
        let step = delta * self.scroll_speed;
        if step.is_finite() && step > 0.0 {
            self.seconds += step;
        }
        self.seconds
    }

    /// Moves to a sampled clock position. A sample that regresses (clock
    /// jitter, seek backwards) is held at the previous value.
    pub fn sync(&mut self, sample: f64) -> f64 {
        if self.paused {
            return self.seconds;
        }
        let target = sample * self.sample_scale;
        if target.is_finite() && target > self.seconds {
            self.seconds = target;
        } else if target.is_finite() && target < self.seconds {
            tracing::trace!(target, front = self.seconds, "clock regressed; holding front");
        }
        self.seconds
    }

    pub fn sync_with(&mut self, clock: &dyn Clock) -> f64 {
        self.sync(clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_applies_scroll_speed() {
        let mut front = TimeFront::new(2.0, 1.0);
        front.advance(0.25);
        assert_eq!(front.seconds(), 0.5);
    }

    #[test]
    fn ignores_negative_and_nan_deltas() {
        let mut front = TimeFront::default();
        front.advance(1.0);
        front.advance(-0.5);
        front.advance(f64::NAN);
        assert_eq!(front.seconds(), 1.0);
    }

    #[test]
    fn regressing_clock_samples_are_held() {
        let clock = ManualClock::new(2.0);
        let mut front = TimeFront::new(1.0, 0.5);

        assert_eq!(front.sync_with(&clock), 1.0);
        clock.set(1.0);
        assert_eq!(front.sync_with(&clock), 1.0);
        clock.set(6.0);
        assert_eq!(front.sync_with(&clock), 3.0);
    }

    #[test]
    fn reset_rewinds_to_zero() {
        let mut front = TimeFront::default();
        front.advance(3.0);
        front.reset();
        assert_eq!(front.seconds(), 0.0);
    }

    #[test]
    fn paused_front_holds_for_deltas_and_samples() {
        let clock = ManualClock::new(4.0);
        let mut front = TimeFront::default();
        front.advance(1.0);
        front.set_paused(true);

        front.advance(2.0);
        front.sync_with(&clock);
        assert_eq!(front.seconds(), 1.0);

        front.set_paused(false);
        assert_eq!(front.sync_with(&clock), 4.0);
    }

    #[test]
    fn scroll_speed_can_change_between_ticks() {
        let mut front = TimeFront::default();
        front.advance(1.0);
        assert_eq!(front.set_scroll_speed(3.0), 3.0);
        assert_eq!(front.set_scroll_speed(f64::NAN), 3.0);
        assert_eq!(front.set_scroll_speed(-1.0), 3.0);
        front.advance(0.5);
        assert_eq!(front.seconds(), 2.5);
    }
}
