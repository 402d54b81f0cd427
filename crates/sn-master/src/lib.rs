//! Headless controller for sonify.
//!
//! Owns a timeline and provides the host loop around it: real-time
//! playback on a control thread feeding the audio device, and offline
//! rendering to frames or WAV. Both the CLI and tests share this API.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use sn_audio::{AudioError, AudioOutput, CpalOutput};
use sn_engine::{FrameSink, MemorySink, PlaybackEvent, SynthConfig, Timeline, TransportError};

// Re-export common types so callers don't need the engine crates directly.
pub use sn_engine::{Frame, PitchMap, Segment};
pub use sn_formats::{FormatError, SessionFile};

/// Error type for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("nothing is playing")]
    NotPlaying,
    #[error("transport command queue is full")]
    CommandQueueFull,
}

/// Offline rendering parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub sample_rate: u32,
    /// Host loop iterations per second.
    pub tick_rate: u32,
    /// Size of the simulated device buffer.
    pub buffer_seconds: f64,
    /// Hard stop for runaway renders.
    pub max_seconds: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            tick_rate: 100,
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            max_seconds: 600,
        }
    }
}

/// Device buffer length. Leaves room for a fade-out and a fade-in at a
/// segment boundary.
pub const DEFAULT_BUFFER_SECONDS: f64 = 0.2;

/// Transport requests sent to the control thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    SeekForward,
    SeekBackward,
}

const COMMAND_CAPACITY: usize = 16;
const NO_SEGMENT: usize = usize::MAX;

/// Headless controller: owns a timeline and manages playback.
pub struct Controller {
    timeline: Timeline,
    config: SynthConfig,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    commands: HeapProd<Command>,
    stop: Arc<AtomicBool>,
    position_millis: Arc<AtomicU64>,
    segment: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_config(SynthConfig::default())
    }

    pub fn with_config(config: SynthConfig) -> Self {
        Self {
            timeline: Timeline::new(),
            config,
            playback: None,
        }
    }

    // --- Session management ---

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Mutable access for editing. Playback works on its own copy, so
    /// edits take effect on the next `play`.
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn load_session(&mut self, json: &str) -> Result<(), MasterError> {
        self.stop();
        self.timeline = sn_formats::read_timeline(json, self.config)?;
        Ok(())
    }

    pub fn save_session(&self) -> Result<String, MasterError> {
        Ok(sn_formats::write_timeline(&self.timeline)?)
    }

    // --- Real-time playback ---

    pub fn play(&mut self) -> Result<(), MasterError> {
        self.stop();
        if self.timeline.is_empty() {
            return Err(TransportError::Empty.into());
        }

        let timeline = self.timeline.clone();
        let (commands, command_rx) = HeapRb::<Command>::new(COMMAND_CAPACITY).split();
        let stop = Arc::new(AtomicBool::new(false));
        let position_millis = Arc::new(AtomicU64::new(0));
        let segment = Arc::new(AtomicUsize::new(NO_SEGMENT));
        let finished = Arc::new(AtomicBool::new(false));

        let shared = Shared {
            stop: stop.clone(),
            position_millis: position_millis.clone(),
            segment: segment.clone(),
            finished: finished.clone(),
        };

        let thread = std::thread::Builder::new()
            .name("sonify-control".into())
            .spawn(move || control_thread(timeline, command_rx, shared))
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        self.playback = Some(PlaybackHandle {
            commands,
            stop,
            position_millis,
            segment,
            finished,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Interrupt playback and wait for the control thread to exit.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn seek_forward(&mut self) -> Result<(), MasterError> {
        self.send(Command::SeekForward)
    }

    pub fn seek_backward(&mut self) -> Result<(), MasterError> {
        self.send(Command::SeekBackward)
    }

    fn send(&mut self, command: Command) -> Result<(), MasterError> {
        let pb = self
            .playback
            .as_mut()
            .filter(|p| !p.finished.load(Ordering::Relaxed))
            .ok_or(MasterError::NotPlaying)?;
        pb.commands.try_push(command).map_err(|_| MasterError::CommandQueueFull)
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Seconds into the timeline, while playing.
    pub fn position(&self) -> Option<f64> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        Some(pb.position_millis.load(Ordering::Relaxed) as f64 / 1000.0)
    }

    /// Index of the segment being played, while playing.
    pub fn current_segment(&self) -> Option<usize> {
        let pb = self.playback.as_ref()?;
        match pb.segment.load(Ordering::Relaxed) {
            NO_SEGMENT => None,
            index => Some(index),
        }
    }

    // --- Offline rendering ---

    /// Drive a copy of the timeline with a fixed-step host loop and
    /// collect every frame it produces.
    pub fn render_frames(&self, config: &RenderConfig) -> Result<Vec<Frame>, MasterError> {
        let mut timeline = self.timeline.clone();
        let frames_per_tick = (config.sample_rate / config.tick_rate.max(1)).max(1) as usize;
        let delta = frames_per_tick as f64 / config.sample_rate as f64;
        let capacity = ((config.sample_rate as f64 * config.buffer_seconds) as usize).max(frames_per_tick);
        let max_ticks = u64::from(config.max_seconds) * config.sample_rate as u64 / frames_per_tick as u64;

        let mut sink = MemorySink::new(config.sample_rate, capacity);
        timeline.start_playing(&mut sink)?;

        let mut ticks = 0u64;
        while timeline.is_playing() {
            if ticks >= max_ticks {
                tracing::warn!(max_seconds = config.max_seconds, "render limit reached");
                timeline.stop_playing(true, &mut sink)?;
                break;
            }
            timeline.tick(delta, &mut sink)?;
            sink.consume(frames_per_tick);
            ticks += 1;
        }

        let frames = sink.take_frames();
        tracing::info!(frames = frames.len(), ticks, "render finished");
        Ok(frames)
    }

    pub fn render_to_wav(&self, config: &RenderConfig) -> Result<Vec<u8>, MasterError> {
        let frames = self.render_frames(config)?;
        Ok(sn_formats::frames_to_wav(&frames, config.sample_rate)?)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Shared {
    /// Set by the controller; checked by the host loop every tick.
    stop: Arc<AtomicBool>,
    position_millis: Arc<AtomicU64>,
    segment: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
}

/// Host loop: applies transport commands, ticks the timeline with wall
/// time and keeps the device ring topped up.
fn control_thread(mut timeline: Timeline, mut commands: HeapCons<Command>, shared: Shared) {
    let (mut output, mut sink) = match CpalOutput::open(DEFAULT_BUFFER_SECONDS) {
        Ok(opened) => opened,
        Err(err) => {
            tracing::error!(%err, "cannot open audio output");
            shared.finished.store(true, Ordering::Relaxed);
            return;
        }
    };

    if let Err(err) = run_timeline(&mut timeline, &mut commands, &mut sink, &shared) {
        tracing::error!(%err, "playback aborted");
        let _ = timeline.stop_playing(true, &mut sink);
    }

    // Let queued audio (including the final fade-out) reach the device.
    let drain_deadline = Instant::now() + Duration::from_secs_f64(DEFAULT_BUFFER_SECONDS * 2.0);
    while sink.queued() > 0 && Instant::now() < drain_deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    if output.underruns() > 0 {
        tracing::warn!(underruns = output.underruns(), "audio buffer ran dry during playback");
    }
    let _ = output.stop();

    shared.segment.store(NO_SEGMENT, Ordering::Relaxed);
    shared.finished.store(true, Ordering::Relaxed);
}

const TICK_INTERVAL: Duration = Duration::from_millis(10);

fn run_timeline<S: FrameSink + ?Sized>(
    timeline: &mut Timeline,
    commands: &mut HeapCons<Command>,
    sink: &mut S,
    shared: &Shared,
) -> Result<(), TransportError> {
    timeline.start_playing(sink)?;
    let mut last = Instant::now();

    while timeline.is_playing() {
        if shared.stop.load(Ordering::Relaxed) {
            timeline.stop_playing(true, sink)?;
            break;
        }
        while let Some(command) = commands.try_pop() {
            apply_command(timeline, command, sink);
        }
        if !timeline.is_playing() {
            break;
        }

        let now = Instant::now();
        timeline.tick((now - last).as_secs_f64(), sink)?;
        last = now;

        for event in timeline.drain_events() {
            if let PlaybackEvent::SegmentStarted { index, .. } = event {
                shared.segment.store(index, Ordering::Relaxed);
            }
        }
        shared
            .position_millis
            .store((timeline.position() * 1000.0) as u64, Ordering::Relaxed);

        std::thread::sleep(TICK_INTERVAL);
    }
    Ok(())
}

fn apply_command<S: FrameSink + ?Sized>(timeline: &mut Timeline, command: Command, sink: &mut S) {
    let result = match command {
        Command::SeekForward => timeline.seek_forward(sink),
        Command::SeekBackward => timeline.seek_backward(sink),
    };
    if let Err(err) = result {
        tracing::warn!(?command, %err, "transport command ignored");
    }
}
