//! External programs the engine drives. Each one owns the physical drive
//! while it runs, so invocations are awaited one at a time.

use crate::cd::{DiscLayout, TrackRange};
use crate::tools::error::ToolResult;
use crate::tools::safecopy::{CopyReport, StageRequest};
use std::path::Path;

pub mod cdparanoia;
pub mod eject;
pub mod error;
pub mod exec;
pub mod safecopy;

/// Reads raw audio sectors from a drive.
#[allow(async_fn_in_trait)]
pub trait DriveReader {
    /// Table of contents of the disc in the drive.
    async fn query(&self) -> ToolResult<DiscLayout>;

    /// Rips every track of `range` in one pass. Track `NN` lands in
    /// [`cdparanoia::batch_track_path`]`(try_prefix, NN)`.
    async fn rip(&self, range: TrackRange, try_prefix: &Path) -> ToolResult<()>;
}

/// Best-effort raw copier that records the byte ranges it could not read.
#[allow(async_fn_in_trait)]
pub trait BadBlockCopier {
    async fn copy_stage(&self, request: &StageRequest<'_>) -> ToolResult<CopyReport>;
}
