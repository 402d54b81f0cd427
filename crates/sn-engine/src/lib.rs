//! Playback engine for sonify.
//!
//! Maps function values to pitch, synthesizes segments into a frame sink,
//! and sequences them on a timeline driven by a discrete clock.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod frame;
mod pitch;
mod segment;
mod sink;
pub mod timeline;

pub use clock::{Clock, ClockError};
pub use frame::Frame;
pub use pitch::{frequency_of, PitchMap};
pub use segment::{
    PreviewPoint, Segment, SegmentError, SegmentState, SynthConfig, DEFAULT_FADE_SECONDS, MAX_PREVIEW_POINTS,
};
pub use sink::{FrameSink, MemorySink};
pub use timeline::{Cursor, PlaybackEvent, SegmentKey, Timeline, TransportError};
