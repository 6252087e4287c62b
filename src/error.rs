use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionState;

/// Encoder could not open a new segment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("capture device is busy")]
    DeviceBusy,

    #[error("unknown encoder error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for PrepareError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Encoder failed to finalize a segment. Never fatal to a transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("segment close failed: {0}")]
pub struct CloseError(pub String);

/// Segments could not be merged into an output file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StitchError {
    #[error("no readable segments")]
    NoReadableSegments,

    #[error("failed to write output: {0}")]
    Write(String),
}

/// The output device could not be acquired for playback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FocusError {
    #[error("audio focus request was denied")]
    RequestFailed,
}

/// Errors reported by the recording session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("failed to prepare encoder: {0}")]
    PrepareFailed(#[from] PrepareError),

    #[error("failed to stitch recording: {0}")]
    StitchFailed(#[from] StitchError),

    #[error("cannot handle `{event}` while {state:?}")]
    InvalidTransition {
        state: SessionState,
        event: &'static str,
    },
}

/// Flat error code carried on the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    PrepareIo,
    DeviceBusy,
    PrepareUnknown,
    CloseFailed,
    NoReadableSegments,
    WriteError,
    InvalidTransition,
    FocusRequestFailed,
}

impl From<&PrepareError> for ErrorCode {
    fn from(err: &PrepareError) -> Self {
        match err {
            PrepareError::Io(_) => Self::PrepareIo,
            PrepareError::DeviceBusy => Self::DeviceBusy,
            PrepareError::Unknown(_) => Self::PrepareUnknown,
        }
    }
}

impl From<&StitchError> for ErrorCode {
    fn from(err: &StitchError) -> Self {
        match err {
            StitchError::NoReadableSegments => Self::NoReadableSegments,
            StitchError::Write(_) => Self::WriteError,
        }
    }
}

impl From<&SessionError> for ErrorCode {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::PrepareFailed(e) => e.into(),
            SessionError::StitchFailed(e) => e.into(),
            SessionError::InvalidTransition { .. } => Self::InvalidTransition,
        }
    }
}
