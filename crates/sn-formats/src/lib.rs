//! Format support for sonify.
//!
//! Parses function text into the IR, loads and saves session files, and
//! encodes rendered audio as WAV.

mod parser;
mod session;
mod wav_format;

use sn_engine::{SegmentError, TransportError};

pub use parser::{parse, parse_function, ParseError, MAX_DEPTH, MAX_TOKENS};
pub use session::{
    load_session, read_timeline, save_session, write_timeline, FunctionRecord, SessionFile, TimelineRecord,
};
pub use wav_format::{frames_to_wav, read_wav, write_wav};

/// Error type for loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("function {index}: {source}")]
    Parse {
        index: usize,
        #[source]
        source: ParseError,
    },
    #[error("function {index}: {source}")]
    Segment {
        index: usize,
        #[source]
        source: SegmentError,
    },
    #[error("function {index} is missing from the session")]
    MissingFunction { index: usize },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAV: {0}")]
    Binary(#[from] binrw::Error),
    #[error("unsupported WAV layout: {0}")]
    UnsupportedWav(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
