use crate::tools::safecopy::Stage;
use std::path::{Path, PathBuf};

/// Every path a session persists, derived from the operator's prefix.
///
/// The prefix's directory holds the files and its file name is the stem, so
/// `rips/album` gives `rips/track01.album.bin`, `rips/album.cue`, ...
#[derive(Debug, Clone)]
pub struct SessionFiles {
    dir: PathBuf,
    stem: String,
}

impl SessionFiles {
    pub fn new(prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref();
        let dir = prefix
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = prefix
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { dir, stem }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    fn file(&self, name: String) -> PathBuf {
        self.dir.join(name)
    }

    pub fn cue(&self) -> PathBuf {
        self.file(format!("{}.cue", self.stem))
    }

    pub fn bin(&self) -> PathBuf {
        self.file(self.bin_name())
    }

    /// Image file name as referenced from the cue sheet.
    pub fn bin_name(&self) -> String {
        format!("{}.bin", self.stem)
    }

    /// Accepted output of one track.
    pub fn track(&self, track_no: u8) -> PathBuf {
        self.file(format!("track{track_no:02}.{}.bin", self.stem))
    }

    /// Output name handed to the drive reader for one try.
    pub fn try_prefix(&self, try_number: u32) -> PathBuf {
        self.file(format!("try{try_number}.{}.bin", self.stem))
    }

    pub fn try_track(&self, track_no: u8, try_number: u32) -> PathBuf {
        self.file(format!("track{track_no:02}.try{try_number}.{}.bin", self.stem))
    }

    pub fn rebuild_track(&self, track_no: u8) -> PathBuf {
        self.file(format!("track{track_no:02}.rebuild.{}.bin", self.stem))
    }

    pub fn badblocks(&self, stage: Stage) -> PathBuf {
        self.file(format!("{}.stage{}.badblocks", self.stem, stage.number()))
    }

    pub fn stage3_old_badblocks(&self) -> PathBuf {
        self.file(format!("{}.stage3.old.badblocks", self.stem))
    }

    pub fn timing(&self, stage: Stage) -> PathBuf {
        self.file(format!("{}.stage{}.timing", self.stem, stage.number()))
    }
}
