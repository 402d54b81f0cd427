//! Segment: one function bound to a time window, and its synthesizer.
//!
//! A segment renders its function as a sine whose pitch follows the
//! function value. Synthesis uses a phase accumulator so the waveform
//! stays continuous while the frequency changes under a fixed sample
//! rate. Start and stop emit short linear ramps to avoid clicks.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::f64::consts::TAU;
use core::fmt;

use sn_ir::{evaluate_at_t, EvalError, Expr, TimeWindow, WindowError, TIME_VARIABLE};

use crate::frame::Frame;
use crate::pitch::PitchMap;
use crate::sink::FrameSink;

/// Default fade-in/fade-out ramp length in seconds.
pub const DEFAULT_FADE_SECONDS: f64 = 0.05;

/// Error type for segment construction and transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("segment is already playing")]
    AlreadyPlaying,
    #[error("segment is not playing")]
    NotPlaying,
}

/// Synthesis parameters shared by every frame a segment renders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthConfig {
    /// Length of the start/stop amplitude ramps.
    pub fade_seconds: f64,
    /// Peak amplitude of the emitted sine.
    pub amplitude: f32,
    /// Value-to-frequency mapping.
    pub pitch: PitchMap,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            fade_seconds: DEFAULT_FADE_SECONDS,
            amplitude: 1.0,
            pitch: PitchMap::default(),
        }
    }
}

/// Segment lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentState {
    #[default]
    Idle,
    Playing,
}

/// Most points kept in a segment's preview table.
pub const MAX_PREVIEW_POINTS: usize = 1024;

/// Cached evaluation at one whole second of the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewPoint {
    pub time: i32,
    pub value: f64,
    pub frequency: Option<f64>,
}

/// A function placed on the timeline.
#[derive(Clone, Debug)]
pub struct Segment {
    /// Authoring source, display only.
    text: String,
    expr: Expr,
    window: TimeWindow,
    config: SynthConfig,
    state: SegmentState,
    /// Frames rendered since `start()`; local time is derived from it.
    rendered: u64,
    /// Oscillator phase in `[0, 1)`.
    phase: f64,
    preview: Vec<PreviewPoint>,
}

impl Segment {
    /// Create a segment for `expr` over `[start, end]`.
    ///
    /// Fails if the window is empty or the expression references any
    /// variable other than `t`, so playback never meets an unbound name.
    pub fn new(text: &str, expr: Expr, start: i32, end: i32) -> Result<Self, SegmentError> {
        Self::with_config(text, expr, start, end, SynthConfig::default())
    }

    pub fn with_config(
        text: &str,
        expr: Expr,
        start: i32,
        end: i32,
        config: SynthConfig,
    ) -> Result<Self, SegmentError> {
        if let Some(name) = expr.variables().into_iter().find(|v| *v != TIME_VARIABLE) {
            return Err(EvalError::UnboundVariable(name.to_string()).into());
        }
        let window = TimeWindow::new(start, end)?;
        let mut segment = Self {
            text: text.to_string(),
            expr,
            window,
            config,
            state: SegmentState::Idle,
            rendered: 0,
            phase: 0.0,
            preview: Vec::new(),
        };
        segment.recompute_preview();
        Ok(segment)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn start_time(&self) -> i32 {
        self.window.start()
    }

    pub fn end_time(&self) -> i32 {
        self.window.end()
    }

    /// Window length in seconds.
    pub fn run_time(&self) -> u32 {
        self.window.run_time()
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SegmentState::Playing
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Frames of function content rendered since the last `start()`.
    pub fn rendered_frames(&self) -> u64 {
        self.rendered
    }

    /// Current local time `t` in `[start, end]` at the given sample rate.
    pub fn local_time(&self, sample_rate: u32) -> f64 {
        self.window.start() as f64 + self.rendered as f64 / sample_rate as f64
    }

    /// Whether the whole window has been rendered.
    pub fn is_exhausted(&self, sample_rate: u32) -> bool {
        self.local_time(sample_rate) >= self.window.end() as f64
    }

    /// Value and frequency at every whole second of the window. Windows
    /// longer than [`MAX_PREVIEW_POINTS`] seconds are sampled at an even
    /// whole-second stride; both ends are always present.
    pub fn preview(&self) -> &[PreviewPoint] {
        &self.preview
    }

    /// Move the segment to a new window and recompute cached tables.
    ///
    /// Rejected while playing; the old window is kept on error.
    pub fn set_window(&mut self, start: i32, end: i32) -> Result<(), SegmentError> {
        if self.is_playing() {
            return Err(SegmentError::AlreadyPlaying);
        }
        self.window = TimeWindow::new(start, end)?;
        self.recompute_preview();
        Ok(())
    }

    pub fn set_config(&mut self, config: SynthConfig) -> Result<(), SegmentError> {
        if self.is_playing() {
            return Err(SegmentError::AlreadyPlaying);
        }
        self.config = config;
        self.recompute_preview();
        Ok(())
    }

    fn recompute_preview(&mut self) {
        let start = i64::from(self.window.start());
        let end = i64::from(self.window.end());
        let stride = ((end - start) as u64).div_ceil(MAX_PREVIEW_POINTS as u64 - 1) as i64;
        self.preview = (0..)
            .map(|i| start + i * stride)
            .take_while(|&time| time < end)
            .chain(core::iter::once(end))
            .map(|time| {
                let time = time as i32;
                let value = evaluate_at_t(&self.expr, time as f64).unwrap_or(f64::NAN);
                PreviewPoint {
                    time,
                    value,
                    frequency: self.config.pitch.frequency_of(value),
                }
            })
            .collect();
    }

    /// Playback frequency at local time `t`, or `None` for silence.
    pub fn frequency_at(&self, t: f64) -> Option<f64> {
        let value = evaluate_at_t(&self.expr, t).ok()?;
        self.config.pitch.frequency_of(value)
    }

    /// Begin playback from the start of the window.
    ///
    /// Resets local time and phase, starts the sink and pushes a fade-in
    /// ramp at the starting frequency.
    pub fn start<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SegmentError> {
        if self.is_playing() {
            return Err(SegmentError::AlreadyPlaying);
        }
        self.rendered = 0;
        self.phase = 0.0;
        sink.start();
        if let Some(freq) = self.frequency_at(self.window.start() as f64) {
            self.fade(sink, freq, Ramp::In);
        }
        self.state = SegmentState::Playing;
        tracing::debug!(segment = %self, "segment started");
        Ok(())
    }

    /// Render as many frames as the sink can take, up to the window end.
    ///
    /// Returns the number of frames pushed. Never allocates or blocks.
    pub fn fill_buffer<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        if !self.is_playing() {
            return 0;
        }
        let sample_rate = sink.sample_rate();
        let available = sink.frames_available();
        let mut written = 0;
        while written < available && !self.is_exhausted(sample_rate) {
            let t = self.local_time(sample_rate);
            let frame = match self.frequency_at(t) {
                Some(freq) => Frame::mono(self.next_sample(freq, sample_rate)),
                None => Frame::silence(),
            };
            self.rendered += 1;
            sink.push_frame(frame);
            written += 1;
        }
        written
    }

    /// Stop playback with a fade-out at the current frequency, then
    /// silence the sink.
    pub fn stop<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SegmentError> {
        if !self.is_playing() {
            return Err(SegmentError::NotPlaying);
        }
        let t = self.local_time(sink.sample_rate());
        if let Some(freq) = self.frequency_at(t) {
            self.fade(sink, freq, Ramp::Out);
        }
        sink.stop();
        self.state = SegmentState::Idle;
        tracing::debug!(segment = %self, "segment stopped");
        Ok(())
    }

    /// Advance the oscillator and return the next sample.
    fn next_sample(&mut self, freq: f64, sample_rate: u32) -> f32 {
        let p = self.phase + freq / sample_rate as f64;
        self.phase = p - libm::floor(p);
        (libm::sin(TAU * self.phase) * self.config.amplitude as f64) as f32
    }

    /// Push a linear amplitude ramp at a fixed frequency. Local time does
    /// not advance; phase does, so the ramp joins the content seamlessly.
    ///
    /// The ramp is shortened to fit the sink's free space so it always
    /// reaches its end gain.
    fn fade<S: FrameSink + ?Sized>(&mut self, sink: &mut S, freq: f64, ramp: Ramp) -> usize {
        let sample_rate = sink.sample_rate();
        let len = ((self.config.fade_seconds * sample_rate as f64) as usize).min(sink.frames_available());
        for i in 0..len {
            let progress = i as f32 / len as f32;
            let gain = match ramp {
                Ramp::In => progress,
                Ramp::Out => 1.0 - progress,
            };
            let sample = self.next_sample(freq, sample_rate);
            sink.push_frame(Frame::mono(sample).scaled(gain));
        }
        len
    }
}

#[derive(Clone, Copy)]
enum Ramp {
    In,
    Out,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}] {}", self.window.start(), self.window.end(), self.text)
    }
}
