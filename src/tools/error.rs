use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("{0}: command not found")]
    NotFound(String),

    #[error("Drive not ready; is there an audio CD in the drive? (gave up after {attempts} attempts)")]
    DriveNotReady { attempts: u32 },

    #[error("{program} exited with status {code}")]
    InvocationFailed {
        program: String,
        code: i32,
        output: String,
    },

    #[error("{program} exited due to a signal")]
    Signaled { program: String, output: String },

    #[error("Unrecognized cdparanoia TOC line: {0}")]
    UnrecognizedTocLine(String),

    #[error("No table of contents in cdparanoia output")]
    MissingToc,

    #[error("cdparanoia listed track {found}, expected track {expected}")]
    TrackOutOfOrder { expected: u8, found: u8 },
}

impl ToolError {
    /// Captured transcript of a failed invocation, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ToolError::InvocationFailed { output, .. } | ToolError::Signaled { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
