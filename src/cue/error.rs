use crate::cd::error::CdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CueError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    CdError(#[from] CdError),

    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("Unknown file type: {0}")]
    InvalidFileType(String),

    #[error("Unknown track type: {0}")]
    InvalidTrackType(String),

    #[error("Unsupported cue sheet track flag: {0}")]
    UnsupportedFlag(String),

    #[error("Invalid quoted string: {0}")]
    InvalidQuotedString(String),

    #[error("{0}")]
    MissingQuoteError(String),

    #[error("Unsupported cue sheet line: {0}")]
    UnsupportedLine(String),

    #[error("Track {found} out of order, expected track {expected}")]
    TrackOutOfOrder { expected: u8, found: u8 },

    #[error("Track {0} has no INDEX 01")]
    MissingIndex(u8),

    #[error("No tracks in cue sheet")]
    NoTracks,
}

pub type CueResult<T> = Result<T, CueError>;
