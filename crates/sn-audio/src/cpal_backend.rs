//! CPAL-based audio output backend.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::ring_sink::{render_callback, RingSink, StreamState};
use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    state: Arc<StreamState>,
}

impl CpalOutput {
    /// Open the default output device with a ring of `buffer_seconds` of
    /// audio, and return the sink that feeds it.
    pub fn open(buffer_seconds: f64) -> Result<(Self, RingSink), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback assumes 2-channel interleaving
        config.channels = 2;

        let sample_rate = config.sample_rate.0;
        let capacity = ((sample_rate as f64 * buffer_seconds) as usize).max(1);
        let (sink, consumer) = RingSink::new(sample_rate, capacity);
        let state = sink.state();

        let mut output = Self {
            device,
            config,
            stream: None,
            state,
        };
        output.build_stream(consumer)?;
        tracing::info!(sample_rate, capacity, "audio device opened");

        Ok((output, sink))
    }

    fn build_stream(&mut self, mut consumer: ringbuf::HeapCons<sn_engine::Frame>) -> Result<(), AudioError> {
        let state = Arc::clone(&self.state);
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render_callback(data, channels, &mut consumer, &state);
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn underruns(&self) -> u64 {
        self.state.underruns()
    }
}
