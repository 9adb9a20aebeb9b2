use crate::cd::TrackRange;
use crate::cue::error::CueError;
use crate::tools::error::ToolError;
use crate::tools::safecopy::Stage;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RipError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    ToolError(#[from] ToolError),

    #[error(transparent)]
    CueError(#[from] CueError),

    #[error("File exists: {0} (use --continue to resume)")]
    OutputExists(PathBuf),

    #[error("Ripping track(s) {range} failed")]
    ReaderInvocationFailed {
        range: TrackRange,
        #[source]
        source: ToolError,
    },

    #[error("File {path:?} size ({size}) does not match that of {expected_path:?} ({expected})")]
    InconsistentAttemptSizes {
        path: PathBuf,
        size: u64,
        expected_path: PathBuf,
        expected: u64,
    },

    #[error("File {path:?} size ({size}) is not exactly divisible by a CD sector size ({sector_size})")]
    UnalignedTrackSize {
        path: PathBuf,
        size: u64,
        sector_size: usize,
    },

    #[error(
        "Track {track_no} sector {sector} is only certain at {count}/{attempts} (use --rebuild-unique-sectors option?)"
    )]
    LowCertaintySector {
        track_no: u8,
        sector: u64,
        count: usize,
        attempts: usize,
    },

    #[error("Giving up; still more tracks to retry: {0} (use --rebuild option?)")]
    RetriesExhausted(UnresolvedTracks),

    #[error("{path:?} ({size}) is less than CDROM low level disk size ({expected})")]
    TruncatedImage {
        path: PathBuf,
        size: u64,
        expected: u64,
    },

    #[error("Image {0:?} is missing (start over without --continue)")]
    MissingImage(PathBuf),

    #[error("{0:?} is not empty; no further stage to escalate to")]
    StageThreeIncomplete(PathBuf),

    #[error("{stage} did not write its badblocks file {path:?}")]
    StageOutputMissing { stage: Stage, path: PathBuf },

    #[error("No accepted output for track {0}")]
    MissingTrack(u8),
}

/// Tracks still without an accepted output when the retry budget ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedTracks(pub Vec<TrackRange>);

impl fmt::Display for UnresolvedTracks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

pub type RipResult<T> = Result<T, RipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_exhausted_lists_ranges() {
        let err = RipError::RetriesExhausted(UnresolvedTracks(vec![
            TrackRange::new(3, 5),
            TrackRange::single(7),
        ]));
        assert_eq!(
            err.to_string(),
            "Giving up; still more tracks to retry: 3-5, 7 (use --rebuild option?)"
        );
    }
}
