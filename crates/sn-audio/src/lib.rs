//! Audio output backends for sonify.

mod cpal_backend;
mod ring_sink;
mod traits;

pub use cpal_backend::CpalOutput;
pub use ring_sink::{render_callback, RingSink, StreamState};
pub use traits::{AudioError, AudioOutput};
