//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
}

/// Trait for audio output backends.
///
/// Frames reach the device through a [`crate::RingSink`]; the output only
/// controls the stream itself.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Start (or resume) the device stream.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Pause the device stream.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Callbacks that found the buffer empty while a segment was playing.
    fn underruns(&self) -> u64;
}
