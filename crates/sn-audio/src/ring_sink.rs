//! Lock-free bridge between the control thread and the audio callback.
//!
//! The control thread owns a [`RingSink`] and renders into it; the device
//! callback owns the matching consumer and drains it with
//! [`render_callback`]. Neither side locks or allocates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use sn_engine::{Frame, FrameSink};

/// State shared by the sink and the callback.
#[derive(Debug, Default)]
pub struct StreamState {
    /// Set while a segment is playing into the sink.
    active: AtomicBool,
    underruns: AtomicU64,
}

impl StreamState {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Producer half of the frame ring, usable as a [`FrameSink`].
pub struct RingSink {
    producer: HeapProd<Frame>,
    sample_rate: u32,
    state: Arc<StreamState>,
}

impl RingSink {
    /// Create a sink with room for `capacity` frames, plus the consumer the
    /// audio callback reads from.
    pub fn new(sample_rate: u32, capacity: usize) -> (Self, HeapCons<Frame>) {
        let (producer, consumer) = HeapRb::<Frame>::new(capacity).split();
        let sink = Self {
            producer,
            sample_rate,
            state: Arc::new(StreamState::default()),
        };
        (sink, consumer)
    }

    pub fn state(&self) -> Arc<StreamState> {
        Arc::clone(&self.state)
    }

    /// Frames pushed but not yet played.
    pub fn queued(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }
}

impl FrameSink for RingSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frames_available(&self) -> usize {
        self.producer.vacant_len()
    }

    fn push_frame(&mut self, frame: Frame) {
        // Full ring: drop rather than block the control thread.
        let _ = self.producer.try_push(frame);
    }

    fn start(&mut self) {
        self.state.active.store(true, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        self.state.active.store(false, Ordering::Relaxed);
    }
}

/// Fill an interleaved device buffer from the ring.
///
/// Queued frames always drain, so fade-outs pushed before a stop are still
/// heard. Running dry counts as an underrun only while the sink is active.
pub fn render_callback<C>(data: &mut [f32], channels: usize, consumer: &mut C, state: &StreamState)
where
    C: Consumer<Item = Frame>,
{
    let mut starved = false;
    for chunk in data.chunks_mut(channels.max(1)) {
        let frame = match consumer.try_pop() {
            Some(frame) => frame,
            None => {
                starved = true;
                Frame::silence()
            }
        };
        // Write stereo pair; zero-fill any extra channels
        for (i, sample) in chunk.iter_mut().enumerate() {
            *sample = match i {
                0 => frame.left,
                1 => frame.right,
                _ => 0.0,
            };
        }
    }
    if starved && state.is_active() {
        state.underruns.fetch_add(1, Ordering::Relaxed);
    }
}
