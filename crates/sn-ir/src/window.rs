//! Whole-second time window a function occupies on the timeline.

/// Error type for window construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// `end` must be strictly after `start`.
    #[error("empty window: end {end} must be after start {start}")]
    Empty { start: i32, end: i32 },
}

/// A `[start, end]` window in whole seconds. Always `end > start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: i32,
    end: i32,
}

impl TimeWindow {
    pub fn new(start: i32, end: i32) -> Result<Self, WindowError> {
        if end <= start {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// Length of the window in seconds.
    pub fn run_time(&self) -> u32 {
        (self.end as i64 - self.start as i64) as u32
    }
}
