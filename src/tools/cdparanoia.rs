//! Drive reader backed by `cdparanoia`.
//!
//! Query mode prints the table of contents, rip mode (batch) writes one raw
//! little-endian PCM file per track of the requested range.

use crate::cd::{DiscLayout, Msf, Track, TrackRange};
use crate::tools::DriveReader;
use crate::tools::error::{ToolError, ToolResult};
use crate::tools::exec::{clean_output, run_checked};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const PROGRAM: &str = "cdparanoia";

/// Drives usually need a moment after a disc is inserted.
pub const NOT_READY_RETRIES: u32 = 8;
pub const NOT_READY_BACKOFF: Duration = Duration::from_secs(2);

const TOC_TITLE: &str = "Table of contents (audio tracks only):";

lazy_static! {
    static ref NOT_READY_RE: Regex =
        Regex::new(r"Unable to open disc\.  Is there an audio CD in the drive\?[\r\n]*$").unwrap();
    static ref TOC_HEADER_RE: Regex = Regex::new(r"^track +length +begin +copy +pre +ch$").unwrap();
    static ref TOC_SEPARATOR_RE: Regex = Regex::new(r"^=+$").unwrap();
    static ref TOC_ROW_RE: Regex = Regex::new(
        r"^ *(?P<track_no>\d+)\. +(?P<length>\d+) +\[\d\d:\d\d\.\d\d\] +(?P<begin>\d+) +\[\d\d:\d\d\.\d\d\] +(?P<copy>no|OK) +(?P<pre>no|yes) +(?P<ch>\d+)$"
    )
    .unwrap();
    static ref TOC_TOTAL_RE: Regex =
        Regex::new(r"^ *TOTAL +\d+ +\[\d\d:\d\d\.\d\d\] +\(audio only\)$").unwrap();
}

#[derive(Debug, Clone)]
pub struct CdparanoiaConfig {
    pub device: String,
    pub sample_offset: i32,
    /// `--never-skip=N`; plain `--never-skip` when unset.
    pub max_skip_retries: Option<u32>,
    pub force_read_speed: Option<u32>,
    pub keep_logs: bool,
}

#[derive(Debug)]
pub struct Cdparanoia {
    config: CdparanoiaConfig,
    retry_not_ready: AtomicBool,
}

impl Cdparanoia {
    pub fn new(config: CdparanoiaConfig) -> Self {
        Self {
            config,
            retry_not_ready: AtomicBool::new(true),
        }
    }

    /// Only the first invocation of a session waits for the drive.
    fn take_not_ready_retries(&self) -> u32 {
        if self.retry_not_ready.swap(false, Ordering::SeqCst) {
            NOT_READY_RETRIES
        } else {
            0
        }
    }

    fn query_args(&self) -> Vec<OsString> {
        vec![
            "--query".into(),
            "--verbose".into(),
            "--force-cdrom-device".into(),
            self.config.device.clone().into(),
        ]
    }

    fn rip_args(&self, range: TrackRange, try_prefix: &Path, log_file: &Path) -> Vec<OsString> {
        let mut log_arg = OsString::from("--log-summary=");
        log_arg.push(log_file);

        let mut args: Vec<OsString> = vec![
            "-d".into(),
            self.config.device.clone().into(),
            "--verbose".into(),
            match self.config.max_skip_retries {
                Some(retries) => format!("--never-skip={retries}").into(),
                None => "--never-skip".into(),
            },
            log_arg,
            "--sample-offset".into(),
            format!("{:+}", self.config.sample_offset).into(),
            "--output-raw-little-endian".into(),
            "--batch".into(),
        ];
        if let Some(speed) = self.config.force_read_speed {
            args.push("--force-read-speed".into());
            args.push(speed.to_string().into());
        }
        args.push("--".into());
        args.push(format!("{}-{}", range.start, range.end).into());
        args.push(try_prefix.as_os_str().to_owned());
        args
    }
}

impl DriveReader for Cdparanoia {
    async fn query(&self) -> ToolResult<DiscLayout> {
        let args = self.query_args();
        let out = retry_while_not_ready(self.take_not_ready_retries(), NOT_READY_BACKOFF, || {
            run_checked(PROGRAM, &args)
        })
        .await?;
        parse_query_output(&clean_output(&out))
    }

    async fn rip(&self, range: TrackRange, try_prefix: &Path) -> ToolResult<()> {
        let log_file = try_prefix.with_extension("cdparanoia.log");
        let args = self.rip_args(range, try_prefix, &log_file);

        let result = retry_while_not_ready(self.take_not_ready_retries(), NOT_READY_BACKOFF, || {
            run_checked(PROGRAM, &args)
        })
        .await;

        if !self.config.keep_logs {
            remove_summary_log(&log_file).await;
        }

        let out = result?;
        debug!("{PROGRAM} transcript:\n{}", clean_output(&out));
        Ok(())
    }
}

/// Failures are logged, never returned.
async fn remove_summary_log(log_file: &Path) {
    match tokio::fs::remove_file(log_file).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!("Could not remove {log_file:?}: {err}"),
    }
}

/// Path of the file batch mode writes for `track_no` when given `try_prefix`
/// as its output name: `track<NN>.` is prepended to the file name.
pub fn batch_track_path(try_prefix: &Path, track_no: u8) -> PathBuf {
    let file_name = try_prefix
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    try_prefix.with_file_name(format!("track{track_no:02}.{file_name}"))
}

/// The failure cdparanoia reports while the drive is still spinning up.
pub fn is_not_ready(err: &ToolError) -> bool {
    match err {
        ToolError::InvocationFailed { code, output, .. } => {
            matches!(*code, 1 | 2) && NOT_READY_RE.is_match(output)
        }
        _ => false,
    }
}

/// Runs `op`, repeating it up to `retries` more times while the drive is
/// not ready. Every other outcome is returned as is.
pub async fn retry_while_not_ready<T, F, Fut>(
    retries: u32,
    backoff: Duration,
    mut op: F,
) -> ToolResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ToolResult<T>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op().await {
            Err(err) if is_not_ready(&err) => {
                if attempts > retries {
                    return Err(ToolError::DriveNotReady { attempts });
                }
                warn!("No audio disc in the drive yet, retrying in {backoff:?}...");
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TocState {
    Preamble,
    Header,
    Separator,
    Rows,
}

/// Parses the `--query` transcript. Lines before the table are drive
/// chatter and skipped; inside the table every line must be recognized.
pub fn parse_query_output(out: &str) -> ToolResult<DiscLayout> {
    let mut state = TocState::Preamble;
    let mut tracks: Vec<Track> = Vec::new();

    for line in out.lines() {
        state = match state {
            TocState::Preamble if line == TOC_TITLE => TocState::Header,
            TocState::Preamble => TocState::Preamble,
            TocState::Header if TOC_HEADER_RE.is_match(line) => TocState::Separator,
            TocState::Separator if TOC_SEPARATOR_RE.is_match(line) => TocState::Rows,
            TocState::Rows if TOC_TOTAL_RE.is_match(line) => {
                if tracks.is_empty() {
                    return Err(ToolError::MissingToc);
                }
                return Ok(DiscLayout::new(tracks, None));
            }
            TocState::Rows => match TOC_ROW_RE.captures(line) {
                Some(caps) => {
                    let Ok(expected) = u8::try_from(tracks.len() + 1) else {
                        return Err(ToolError::UnrecognizedTocLine(line.to_string()));
                    };
                    let found = parse_number(&caps["track_no"], line)?;
                    if found != expected {
                        return Err(ToolError::TrackOutOfOrder { expected, found });
                    }
                    tracks.push(Track {
                        begin: Msf::from_frames(parse_number(&caps["begin"], line)?),
                        length: Some(Msf::from_frames(parse_number(&caps["length"], line)?)),
                        copy_permitted: &caps["copy"] == "OK",
                        pre_emphasis: &caps["pre"] == "yes",
                        audio_channels: parse_number(&caps["ch"], line)?,
                    });
                    TocState::Rows
                }
                None => return Err(ToolError::UnrecognizedTocLine(line.to_string())),
            },
            TocState::Header | TocState::Separator => {
                return Err(ToolError::UnrecognizedTocLine(line.to_string()));
            }
        };
    }

    Err(ToolError::MissingToc)
}

fn parse_number<T: std::str::FromStr>(digits: &str, line: &str) -> ToolResult<T> {
    digits
        .parse()
        .map_err(|_| ToolError::UnrecognizedTocLine(line.to_string()))
}
