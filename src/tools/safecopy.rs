use crate::tools::BadBlockCopier;
use crate::tools::error::{ToolError, ToolResult};
use crate::tools::exec::{clean_output, run};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

const PROGRAM: &str = "safecopy";

lazy_static! {
    static ref DISK_SIZE_RE: Regex = Regex::new(r"^CDROM low level disk size: (\d+)$").unwrap();
    static ref COPIED_RE: Regex = Regex::new(r"^Blocks \(bytes\) copied: (\d+) \((\d+)\)$").unwrap();
}

/// Escalating copier presets; later stages are slower and more patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    One,
    Two,
    Three,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::One => 1,
            Stage::Two => 2,
            Stage::Three => 3,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::One => Some(Stage::Two),
            Stage::Two => Some(Stage::Three),
            Stage::Three => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage {}", self.number())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    pub stage: Stage,
    pub destination: &'a Path,
    /// Only these byte ranges are re-attempted.
    pub input_badblocks: Option<&'a Path>,
    pub output_badblocks: &'a Path,
    pub timing: Option<&'a Path>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub low_level_disk_size: Option<u64>,
    pub blocks_copied: Option<u64>,
    pub bytes_copied: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SafecopyConfig {
    pub device: String,
}

#[derive(Debug)]
pub struct Safecopy {
    config: SafecopyConfig,
}

impl Safecopy {
    pub fn new(config: SafecopyConfig) -> Self {
        Self { config }
    }

    fn stage_args(&self, request: &StageRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![format!("--stage{}", request.stage.number()).into()];
        if let Some(timing) = request.timing {
            args.push("-T".into());
            args.push(timing.as_os_str().to_owned());
        }
        if let Some(input) = request.input_badblocks {
            args.push("-I".into());
            args.push(input.as_os_str().to_owned());
        }
        args.push("-o".into());
        args.push(request.output_badblocks.as_os_str().to_owned());
        args.push(self.config.device.clone().into());
        args.push(request.destination.as_os_str().to_owned());
        args
    }
}

impl BadBlockCopier for Safecopy {
    async fn copy_stage(&self, request: &StageRequest<'_>) -> ToolResult<CopyReport> {
        let output = run(PROGRAM, &self.stage_args(request)).await?;
        let out = clean_output(&output.out);
        debug!("{PROGRAM} transcript:\n{out}");

        // Unread blocks make safecopy exit non-zero; they are reported
        // through the output badblocks file instead.
        if output.code.is_none() {
            return Err(ToolError::Signaled {
                program: PROGRAM.to_string(),
                output: out,
            });
        }

        Ok(parse_report(&out))
    }
}

pub fn parse_report(out: &str) -> CopyReport {
    let mut report = CopyReport::default();
    for line in out.lines() {
        if let Some(caps) = DISK_SIZE_RE.captures(line) {
            report.low_level_disk_size = caps[1].parse().ok();
        } else if let Some(caps) = COPIED_RE.captures(line) {
            report.blocks_copied = caps[1].parse().ok();
            report.bytes_copied = caps[2].parse().ok();
        }
    }
    report
}
