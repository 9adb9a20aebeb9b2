//! In-process stand-ins for the external programs.

use crate::cd::{DiscLayout, Msf, Track, TrackRange};
use crate::rip::{RipOptions, Ripper};
use crate::tools::cdparanoia::batch_track_path;
use crate::tools::error::{ToolError, ToolResult};
use crate::tools::safecopy::{CopyReport, Stage, StageRequest};
use crate::tools::{BadBlockCopier, DriveReader};
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::{self, OpenOptions};

pub fn options(prefix: PathBuf) -> RipOptions {
    RipOptions {
        prefix,
        resume: false,
        ripper: Ripper::Cdparanoia,
        max_track_retries: None,
        rebuild: false,
        rebuild_unique_sectors: false,
        save_temps: false,
        safecopy_timing: false,
        eject: false,
        device: "/dev/null".to_string(),
    }
}

pub fn quiet_progress() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
}

type TrackContent = Box<dyn Fn(u8, u32) -> Vec<u8> + Send + Sync>;

/// Drive reader whose track contents come from a closure of
/// `(track number, how many times that track has been read)`.
pub struct FakeDrive {
    layout: DiscLayout,
    content: TrackContent,
    failing_track: Option<u8>,
    reads: Mutex<HashMap<u8, u32>>,
    calls: Mutex<Vec<TrackRange>>,
    queries: Mutex<usize>,
}

impl FakeDrive {
    pub fn new(track_count: u8, content: impl Fn(u8, u32) -> Vec<u8> + Send + Sync + 'static) -> Self {
        let tracks = (0..u32::from(track_count))
            .map(|i| Track::new(Msf::from_frames(i), Some(Msf::from_frames(1))))
            .collect();
        Self::with_layout(DiscLayout::new(tracks, None), content)
    }

    pub fn with_layout(
        layout: DiscLayout,
        content: impl Fn(u8, u32) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        Self {
            layout,
            content: Box::new(content),
            failing_track: None,
            reads: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            queries: Mutex::new(0),
        }
    }

    /// Dies halfway through writing `track_no`.
    pub fn failing_on(mut self, track_no: u8) -> Self {
        self.failing_track = Some(track_no);
        self
    }

    pub fn calls(&self) -> Vec<TrackRange> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

impl DriveReader for FakeDrive {
    async fn query(&self) -> ToolResult<DiscLayout> {
        *self.queries.lock().unwrap() += 1;
        Ok(self.layout.clone())
    }

    async fn rip(&self, range: TrackRange, try_prefix: &Path) -> ToolResult<()> {
        self.calls.lock().unwrap().push(range);
        for track_no in range.tracks() {
            let read = {
                let mut reads = self.reads.lock().unwrap();
                let count = reads.entry(track_no).or_insert(0);
                *count += 1;
                *count
            };
            let data = (self.content)(track_no, read);
            let path = batch_track_path(try_prefix, track_no);
            if self.failing_track == Some(track_no) {
                fs::write(&path, &data[..data.len() / 2]).await?;
                return Err(ToolError::InvocationFailed {
                    program: "cdparanoia".to_string(),
                    code: 1,
                    output: "scsi read error".to_string(),
                });
            }
            fs::write(&path, data).await?;
        }
        Ok(())
    }
}

/// Copier that writes a fixed-size image on stage 1 and the configured
/// range file contents on every stage.
pub struct FakeCopier {
    image_size: u64,
    report: CopyReport,
    badblocks: HashMap<Stage, String>,
    writes_badblocks: bool,
    stages: Mutex<Vec<Stage>>,
    inputs: Mutex<Vec<Option<PathBuf>>>,
}

impl FakeCopier {
    pub fn new(image_size: u64, report: CopyReport) -> Self {
        Self {
            image_size,
            report,
            badblocks: HashMap::new(),
            writes_badblocks: true,
            stages: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_badblocks(mut self, stage: Stage, ranges: &str) -> Self {
        self.badblocks.insert(stage, ranges.to_string());
        self
    }

    pub fn without_badblocks(mut self) -> Self {
        self.writes_badblocks = false;
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<Option<PathBuf>> {
        self.inputs.lock().unwrap().clone()
    }
}

impl BadBlockCopier for FakeCopier {
    async fn copy_stage(&self, request: &StageRequest<'_>) -> ToolResult<CopyReport> {
        self.stages.lock().unwrap().push(request.stage);
        self.inputs
            .lock()
            .unwrap()
            .push(request.input_badblocks.map(Path::to_path_buf));

        if request.stage == Stage::One {
            let image = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(request.destination)
                .await?;
            image.set_len(self.image_size).await?;
        }
        if self.writes_badblocks {
            let ranges = self.badblocks.get(&request.stage).cloned().unwrap_or_default();
            fs::write(request.output_badblocks, ranges).await?;
        }
        Ok(self.report.clone())
    }
}
