//! Pull-based frame sink: the capability segments render into.

use alloc::vec::Vec;

use crate::frame::Frame;

/// Where synthesized frames go.
///
/// Producers never block: they ask how much room there is, push at most
/// that many frames, and come back on the next tick.
pub trait FrameSink {
    /// Fixed output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of frames that can be pushed right now without dropping.
    fn frames_available(&self) -> usize;

    /// Push one frame. Frames pushed beyond capacity are dropped.
    fn push_frame(&mut self, frame: Frame);

    /// Begin (or resume) output.
    fn start(&mut self);

    /// Silence output. Frames already pushed may still drain.
    fn stop(&mut self);
}

/// In-memory sink that records every frame it accepts.
///
/// Models a device buffer of `capacity` frames: pushed frames stay queued
/// until [`MemorySink::consume`] plays them out. Used for offline rendering
/// and for tests.
#[derive(Clone, Debug)]
pub struct MemorySink {
    sample_rate: u32,
    capacity: usize,
    queued: usize,
    frames: Vec<Frame>,
    running: bool,
    starts: usize,
    stops: usize,
    dropped: usize,
}

impl MemorySink {
    pub fn new(sample_rate: u32, capacity: usize) -> Self {
        Self {
            sample_rate,
            capacity,
            queued: 0,
            frames: Vec::new(),
            running: false,
            starts: 0,
            stops: 0,
            dropped: 0,
        }
    }

    /// Every frame accepted so far, in push order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Take the recorded frames, leaving the queue state untouched.
    pub fn take_frames(&mut self) -> Vec<Frame> {
        core::mem::take(&mut self.frames)
    }

    /// Simulate the device playing `frames` queued frames.
    pub fn consume(&mut self, frames: usize) {
        self.queued = self.queued.saturating_sub(frames);
    }

    /// Frames pushed but not yet consumed.
    pub fn queued(&self) -> usize {
        self.queued
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start_count(&self) -> usize {
        self.starts
    }

    pub fn stop_count(&self) -> usize {
        self.stops
    }

    /// Frames rejected because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl FrameSink for MemorySink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frames_available(&self) -> usize {
        self.capacity - self.queued
    }

    fn push_frame(&mut self, frame: Frame) {
        if self.queued >= self.capacity {
            self.dropped += 1;
            return;
        }
        self.queued += 1;
        self.frames.push(frame);
    }

    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }
}
