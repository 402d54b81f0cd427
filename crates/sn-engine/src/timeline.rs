//! Timeline scheduler: sequences segments against the discrete clock.
//!
//! The host calls [`Timeline::tick`] once per frame of its loop. Each tick
//! advances the clock, lets the scheduler decide whether to move to the
//! next segment (or finish), and then asks the active segment to fill the
//! sink. Transport calls (`start_playing`, `stop_playing`, seeks) are
//! synchronous and leave the timeline in a consistent state on error.

use alloc::vec::Vec;

use heapless::Deque;
use slotmap::SlotMap;

use crate::clock::{Clock, ClockError};
use crate::segment::{Segment, SegmentError};
use crate::sink::FrameSink;

slotmap::new_key_type! {
    /// Stable handle to a segment, valid across reordering.
    pub struct SegmentKey;
}

/// Pending playback events kept before the oldest is dropped.
pub const EVENT_CAPACITY: usize = 32;

/// Playback position of the scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    NotStarted,
    Segment(usize),
    Finished,
}

/// Notifications the scheduler pushes for the host to drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    SegmentStarted { index: usize, key: SegmentKey },
    SegmentStopped { index: usize, key: SegmentKey },
    Sought { index: usize },
    PlaybackFinished { interrupted: bool },
}

/// Error type for timeline editing and transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("timeline is empty")]
    Empty,
    #[error("timeline is already playing")]
    AlreadyPlaying,
    #[error("timeline is not playing")]
    NotPlaying,
    #[error("timeline cannot be edited while playing")]
    Playing,
    #[error("no segment after the current one")]
    NoNextSegment,
    #[error("no segment before the current one")]
    NoPreviousSegment,
    #[error("playback has not reached the end of the timeline")]
    NotFinished,
    #[error("unknown segment")]
    UnknownSegment,
    #[error("index {index} out of range for {len} segments")]
    OutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error(transparent)]
    Segment(#[from] SegmentError),
}

/// Ordered segments plus the transport state that plays them.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    segments: SlotMap<SegmentKey, Segment>,
    /// Playback order.
    order: Vec<SegmentKey>,
    clock: Clock,
    cursor: Cursor,
    playing: bool,
    events: Deque<PlaybackEvent, EVENT_CAPACITY>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Editing -----------------------------------------------------------

    /// Append a segment at the end of the playback order.
    pub fn push(&mut self, segment: Segment) -> Result<SegmentKey, TransportError> {
        self.insert(self.order.len(), segment)
    }

    /// Insert a segment so that it plays at position `index`.
    pub fn insert(&mut self, index: usize, segment: Segment) -> Result<SegmentKey, TransportError> {
        self.ensure_stopped()?;
        if index > self.order.len() {
            return Err(TransportError::OutOfRange { index, len: self.order.len() });
        }
        let key = self.segments.insert(segment);
        self.order.insert(index, key);
        Ok(key)
    }

    pub fn remove(&mut self, key: SegmentKey) -> Result<Segment, TransportError> {
        self.ensure_stopped()?;
        let segment = self.segments.remove(key).ok_or(TransportError::UnknownSegment)?;
        self.order.retain(|k| *k != key);
        Ok(segment)
    }

    /// Move a segment to playback position `index`.
    pub fn move_to(&mut self, key: SegmentKey, index: usize) -> Result<(), TransportError> {
        self.ensure_stopped()?;
        let from = self.index_of(key).ok_or(TransportError::UnknownSegment)?;
        if index >= self.order.len() {
            return Err(TransportError::OutOfRange { index, len: self.order.len() });
        }
        let key = self.order.remove(from);
        self.order.insert(index, key);
        Ok(())
    }

    /// Change a segment's time window; see [`Segment::set_window`].
    pub fn set_window(&mut self, key: SegmentKey, start: i32, end: i32) -> Result<(), TransportError> {
        self.ensure_stopped()?;
        let segment = self.segments.get_mut(key).ok_or(TransportError::UnknownSegment)?;
        segment.set_window(start, end)?;
        Ok(())
    }

    /// Drop every segment and return to the initial state.
    pub fn reset(&mut self) -> Result<(), TransportError> {
        self.ensure_stopped()?;
        self.segments.clear();
        self.order.clear();
        self.clock.reset();
        self.cursor = Cursor::NotStarted;
        self.events.clear();
        Ok(())
    }

    pub fn get(&self, key: SegmentKey) -> Option<&Segment> {
        self.segments.get(key)
    }

    /// Segment at playback position `index`.
    pub fn segment_at(&self, index: usize) -> Option<&Segment> {
        self.order.get(index).and_then(|key| self.segments.get(*key))
    }

    pub fn key_at(&self, index: usize) -> Option<SegmentKey> {
        self.order.get(index).copied()
    }

    pub fn index_of(&self, key: SegmentKey) -> Option<usize> {
        self.order.iter().position(|k| *k == key)
    }

    /// Segments in playback order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentKey, &Segment)> + '_ {
        self.order
            .iter()
            .filter_map(move |key| self.segments.get(*key).map(|s| (*key, s)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total length in seconds: the sum of every segment's run time.
    pub fn run_time(&self) -> u64 {
        self.iter().map(|(_, s)| u64::from(s.run_time())).sum()
    }

    /// Timeline time at which the segment at `index` begins.
    pub fn offset_of(&self, index: usize) -> u64 {
        self.order
            .iter()
            .take(index)
            .filter_map(|key| self.segments.get(*key))
            .map(|s| u64::from(s.run_time()))
            .sum()
    }

    fn ensure_stopped(&self) -> Result<(), TransportError> {
        if self.playing {
            Err(TransportError::Playing)
        } else {
            Ok(())
        }
    }

    // --- Transport ---------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Index of the segment being played, if any.
    pub fn current_index(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Segment(index) => Some(index),
            _ => None,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Seconds since playback started, on the timeline's axis.
    pub fn position(&self) -> f64 {
        self.clock.absolute_time()
    }

    /// Begin playback from the first segment.
    pub fn start_playing<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), TransportError> {
        if self.order.is_empty() {
            return Err(TransportError::Empty);
        }
        if self.playing {
            return Err(TransportError::AlreadyPlaying);
        }
        self.clock.reset();
        self.cursor = Cursor::NotStarted;
        self.playing = true;
        self.clock.begin_tracking()?;
        tracing::info!(
            segments = self.order.len(),
            run_time = self.run_time(),
            "playback started"
        );
        self.step(sink)
    }

    /// Stop playback.
    ///
    /// Without `interrupted`, this only succeeds once the clock has reached
    /// the end of the timeline.
    pub fn stop_playing<S: FrameSink + ?Sized>(
        &mut self,
        interrupted: bool,
        sink: &mut S,
    ) -> Result<(), TransportError> {
        if !self.playing {
            return Err(TransportError::NotPlaying);
        }
        if !interrupted && self.clock.rounded_time() < self.run_time() as i64 {
            return Err(TransportError::NotFinished);
        }
        self.stop_active(sink)?;
        self.cursor = Cursor::NotStarted;
        self.playing = false;
        if self.clock.is_tracking() {
            self.clock.end_tracking()?;
        }
        self.clock.pause()?;
        self.emit(PlaybackEvent::PlaybackFinished { interrupted });
        tracing::info!(interrupted, position = self.clock.absolute_time(), "playback finished");
        Ok(())
    }

    /// Jump to the start of the next segment.
    pub fn seek_forward<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), TransportError> {
        if !self.playing {
            return Err(TransportError::NotPlaying);
        }
        match self.cursor {
            Cursor::Segment(index) if index + 1 < self.order.len() => self.seek_to(index + 1, sink),
            _ => Err(TransportError::NoNextSegment),
        }
    }

    /// Jump to the start of the previous segment.
    pub fn seek_backward<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), TransportError> {
        if !self.playing {
            return Err(TransportError::NotPlaying);
        }
        match self.cursor {
            Cursor::Segment(index) if index > 0 => self.seek_to(index - 1, sink),
            _ => Err(TransportError::NoPreviousSegment),
        }
    }

    /// Jump to the start of the segment at `index`.
    ///
    /// The clock moves to the segment's offset on the timeline and tracking
    /// restarts there, so the segment plays its full run time.
    pub fn seek_to<S: FrameSink + ?Sized>(&mut self, index: usize, sink: &mut S) -> Result<(), TransportError> {
        if !self.playing {
            return Err(TransportError::NotPlaying);
        }
        if index >= self.order.len() {
            return Err(TransportError::OutOfRange { index, len: self.order.len() });
        }
        self.stop_active(sink)?;
        let origin = self.offset_of(index) as f64;
        self.clock.seek(origin);
        self.clock.track_from(origin)?;
        self.emit(PlaybackEvent::Sought { index });
        tracing::debug!(index, origin, "seek");
        self.start_at(index, sink)
    }

    /// Advance the clock by `delta` seconds, run the scheduler, then fill
    /// the sink from the active segment.
    ///
    /// Returns the number of frames rendered this tick.
    pub fn tick<S: FrameSink + ?Sized>(&mut self, delta: f64, sink: &mut S) -> Result<usize, TransportError> {
        self.clock.tick(delta);
        if self.clock.time_changed() {
            tracing::trace!(second = self.clock.rounded_time(), "clock");
        }
        if !self.playing {
            return Ok(0);
        }
        self.step(sink)?;
        Ok(self.fill(sink))
    }

    /// Decide whether to finish, advance or keep the current segment.
    fn step<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), TransportError> {
        match self.cursor {
            Cursor::Finished => self.stop_playing(false, sink),
            Cursor::NotStarted => {
                self.clock.track_from(0.0)?;
                self.start_at(0, sink)
            }
            Cursor::Segment(index) => {
                let run_time = self.segment_at(index).map_or(0, Segment::run_time);
                if self.clock.elapsed_time() < f64::from(run_time) {
                    return Ok(());
                }
                if index + 1 < self.order.len() {
                    self.stop_active(sink)?;
                    // Track from the nominal boundary, not the tick that crossed it.
                    self.clock.track_from(self.offset_of(index + 1) as f64)?;
                    self.start_at(index + 1, sink)
                } else {
                    self.stop_active(sink)?;
                    self.cursor = Cursor::Finished;
                    self.stop_playing(false, sink)
                }
            }
        }
    }

    fn fill<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let Some(key) = self.current_index().and_then(|i| self.key_at(i)) else {
            return 0;
        };
        let Some(segment) = self.segments.get_mut(key) else {
            return 0;
        };
        #[cfg(feature = "alloc_check")]
        let written = assert_no_alloc::assert_no_alloc(|| segment.fill_buffer(sink));
        #[cfg(not(feature = "alloc_check"))]
        let written = segment.fill_buffer(sink);
        written
    }

    fn start_at<S: FrameSink + ?Sized>(&mut self, index: usize, sink: &mut S) -> Result<(), TransportError> {
        let key = self.key_at(index).ok_or(TransportError::OutOfRange { index, len: self.order.len() })?;
        let segment = self.segments.get_mut(key).ok_or(TransportError::UnknownSegment)?;
        segment.start(sink)?;
        self.cursor = Cursor::Segment(index);
        self.emit(PlaybackEvent::SegmentStarted { index, key });
        tracing::debug!(index, position = self.clock.absolute_time(), "cursor advanced");
        Ok(())
    }

    /// Stop the active segment, if it is playing.
    fn stop_active<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), TransportError> {
        let Some(index) = self.current_index() else {
            return Ok(());
        };
        let Some(key) = self.key_at(index) else {
            return Ok(());
        };
        if let Some(segment) = self.segments.get_mut(key) {
            if segment.is_playing() {
                segment.stop(sink)?;
                self.emit(PlaybackEvent::SegmentStopped { index, key });
            }
        }
        Ok(())
    }

    // --- Events ------------------------------------------------------------

    fn emit(&mut self, event: PlaybackEvent) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        let _ = self.events.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = PlaybackEvent> + '_ {
        core::iter::from_fn(move || self.events.pop_front())
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}
