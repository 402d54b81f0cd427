//! Discrete clock driven by host ticks.
//!
//! Tracks absolute time, reports when the whole-second reading changes,
//! and runs a tracking sub-timer that measures elapsed time from an
//! origin. The scheduler uses tracking to decide when a segment is done.

/// Error type for clock state transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("cannot pause while tracking elapsed time")]
    PauseWhileTracking,
    #[error("clock is not paused")]
    NotPaused,
    #[error("cannot track elapsed time while paused")]
    TrackWhilePaused,
    #[error("clock is not tracking")]
    NotTracking,
}

/// Tick-driven clock with a tracking sub-timer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clock {
    /// Seconds since reset.
    absolute: f64,
    /// `floor(absolute)` as of the last tick.
    rounded: i64,
    /// Whether the last tick moved `rounded`.
    time_changed: bool,
    paused: bool,
    tracking: bool,
    tracking_start: f64,
    /// `absolute - tracking_start`, only meaningful while tracking.
    elapsed: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `delta` seconds. Returns `false` (and does nothing)
    /// while paused.
    pub fn tick(&mut self, delta: f64) -> bool {
        if self.paused {
            self.time_changed = false;
            return false;
        }
        self.absolute += delta;
        let rounded = libm::floor(self.absolute) as i64;
        self.time_changed = rounded != self.rounded;
        self.rounded = rounded;
        if self.tracking {
            self.elapsed = self.absolute - self.tracking_start;
        }
        true
    }

    /// Freeze the clock. Not allowed mid-measurement.
    pub fn pause(&mut self) -> Result<(), ClockError> {
        if self.tracking {
            return Err(ClockError::PauseWhileTracking);
        }
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self) -> Result<(), ClockError> {
        if !self.paused {
            return Err(ClockError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }

    /// Start measuring elapsed time from now.
    pub fn begin_tracking(&mut self) -> Result<(), ClockError> {
        self.track_from(self.absolute)
    }

    /// Start measuring elapsed time from an explicit origin on the
    /// absolute clock.
    pub fn track_from(&mut self, origin: f64) -> Result<(), ClockError> {
        if self.paused {
            return Err(ClockError::TrackWhilePaused);
        }
        self.tracking = true;
        self.tracking_start = origin;
        self.elapsed = self.absolute - origin;
        Ok(())
    }

    /// Move the tracking origin to now without touching absolute time.
    pub fn reset_tracking(&mut self) -> Result<(), ClockError> {
        if !self.tracking {
            return Err(ClockError::NotTracking);
        }
        self.tracking_start = self.absolute;
        self.elapsed = 0.0;
        Ok(())
    }

    pub fn end_tracking(&mut self) -> Result<(), ClockError> {
        if !self.tracking {
            return Err(ClockError::NotTracking);
        }
        self.tracking = false;
        self.elapsed = 0.0;
        Ok(())
    }

    /// Jump the absolute clock to `time`. The jump itself does not count
    /// as a second change; the next tick compares against the new reading.
    pub fn seek(&mut self, time: f64) {
        self.absolute = time;
        self.rounded = libm::floor(time) as i64;
        self.time_changed = false;
        if self.tracking {
            self.elapsed = self.absolute - self.tracking_start;
        }
    }

    /// Zero all state, including pause and tracking.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn absolute_time(&self) -> f64 {
        self.absolute
    }

    pub fn rounded_time(&self) -> i64 {
        self.rounded
    }

    pub fn time_changed(&self) -> bool {
        self.time_changed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn tracking_start(&self) -> f64 {
        self.tracking_start
    }

    /// Seconds since the tracking origin; zero when not tracking.
    pub fn elapsed_time(&self) -> f64 {
        if self.tracking {
            self.elapsed
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_accumulates_absolute_time() {
        let mut clock = Clock::new();
        assert!(clock.tick(0.25));
        assert!(clock.tick(0.5));
        assert_eq!(clock.absolute_time(), 0.75);
        assert_eq!(clock.rounded_time(), 0);
    }

    #[test]
    fn time_changed_only_on_second_boundaries() {
        let mut clock = Clock::new();
        let mut changes = Vec::new();
        for i in 1..=10 {
            clock.tick(0.25);
            if clock.time_changed() {
                changes.push((i, clock.rounded_time()));
            }
        }
        assert_eq!(changes, [(4, 1), (8, 2)]);
    }

    #[test]
    fn large_step_reports_one_change() {
        let mut clock = Clock::new();
        clock.tick(3.5);
        assert!(clock.time_changed());
        assert_eq!(clock.rounded_time(), 3);
        clock.tick(0.1);
        assert!(!clock.time_changed());
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = Clock::new();
        clock.tick(1.0);
        clock.pause().unwrap();
        assert!(!clock.tick(5.0));
        assert_eq!(clock.absolute_time(), 1.0);
        assert!(!clock.time_changed());
        clock.unpause().unwrap();
        clock.tick(1.0);
        assert_eq!(clock.absolute_time(), 2.0);
    }

    #[test]
    fn cannot_pause_while_tracking() {
        let mut clock = Clock::new();
        clock.begin_tracking().unwrap();
        assert_eq!(clock.pause(), Err(ClockError::PauseWhileTracking));
        assert!(!clock.is_paused());
    }

    #[test]
    fn cannot_unpause_running_clock() {
        let mut clock = Clock::new();
        assert_eq!(clock.unpause(), Err(ClockError::NotPaused));
    }

    #[test]
    fn cannot_track_while_paused() {
        let mut clock = Clock::new();
        clock.pause().unwrap();
        assert_eq!(clock.begin_tracking(), Err(ClockError::TrackWhilePaused));
        assert!(!clock.is_tracking());
    }

    #[test]
    fn elapsed_measures_from_tracking_start() {
        let mut clock = Clock::new();
        clock.tick(1.0);
        clock.begin_tracking().unwrap();
        for _ in 0..4 {
            clock.tick(1.0);
        }
        assert_eq!(clock.elapsed_time(), 4.0);
        assert_eq!(clock.absolute_time(), 5.0);
        clock.end_tracking().unwrap();
        assert_eq!(clock.elapsed_time(), 0.0);
    }

    #[test]
    fn reset_tracking_keeps_absolute_time() {
        let mut clock = Clock::new();
        clock.begin_tracking().unwrap();
        clock.tick(3.0);
        clock.reset_tracking().unwrap();
        assert_eq!(clock.elapsed_time(), 0.0);
        assert_eq!(clock.absolute_time(), 3.0);
        clock.tick(1.5);
        assert_eq!(clock.elapsed_time(), 1.5);
    }

    #[test]
    fn reset_tracking_requires_tracking() {
        let mut clock = Clock::new();
        assert_eq!(clock.reset_tracking(), Err(ClockError::NotTracking));
        assert_eq!(clock.end_tracking(), Err(ClockError::NotTracking));
    }

    #[test]
    fn track_from_origin_in_the_past() {
        let mut clock = Clock::new();
        clock.tick(7.0);
        clock.track_from(5.0).unwrap();
        assert_eq!(clock.elapsed_time(), 2.0);
    }

    #[test]
    fn seek_moves_absolute_and_rounded() {
        let mut clock = Clock::new();
        clock.tick(7.2);
        clock.track_from(5.0).unwrap();
        clock.seek(5.0);
        assert_eq!(clock.rounded_time(), 5);
        assert_eq!(clock.elapsed_time(), 0.0);
        clock.tick(0.5);
        assert!(!clock.time_changed());
        clock.tick(0.5);
        assert!(clock.time_changed());
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut clock = Clock::new();
        clock.tick(2.0);
        clock.begin_tracking().unwrap();
        clock.reset();
        assert_eq!(clock, Clock::default());
    }
}
