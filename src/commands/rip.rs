use crate::rip::{RipOptions, Ripper};
use crate::tools::cdparanoia::CdparanoiaConfig;
use crate::tools::safecopy::SafecopyConfig;
use clap::{Args, Parser};
use std::path::PathBuf;

/// Drive selection and read tuning shared by every command.
#[derive(Args, Debug, Clone, Eq, PartialEq)]
pub struct DriveArgs {
    /// Specify the CD-ROM device file
    #[arg(long, env = "CDROM", default_value = "/dev/cdrom")]
    pub device: String,

    /// Device sample offset correction
    #[arg(long, default_value_t = 6, allow_negative_numbers = true)]
    pub device_sample_offset: i32,

    /// Force the drive's read speed
    #[arg(long, value_name = "SPEED")]
    pub force_read_speed: Option<u32>,

    /// Retries cdparanoia makes on a skip before giving up (--never-skip=N)
    #[arg(long, value_name = "N")]
    pub cdparanoia_max_skip_retries: Option<u32>,
}

/// Rips the disc in the drive to <PREFIX>.bin and <PREFIX>.cue.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
pub struct RipCommand {
    /// Output prefix; the file name part names every session file
    #[arg(value_name = "PREFIX")]
    pub prefix: PathBuf,

    /// Continue a previous session, reusing the files it left behind
    #[arg(long = "continue", short = 'c', default_value_t = false)]
    pub resume: bool,

    #[command(flatten)]
    pub drive: DriveArgs,

    /// Ripping strategy
    #[arg(long, value_enum, default_value_t = Ripper::Cdparanoia)]
    pub ripper: Ripper,

    /// Maximum number of tries per track (unlimited when unset)
    #[arg(long, value_name = "N")]
    pub max_track_retries: Option<u32>,

    /// Rebuild tracks from their most common sectors if all else fails
    #[arg(long, default_value_t = false)]
    pub rebuild: bool,

    /// Rebuild tracks even from sectors no two reads agree on
    #[arg(long, default_value_t = false)]
    pub rebuild_unique_sectors: bool,

    /// Keep intermediate files
    #[arg(long, default_value_t = false)]
    pub save_temps: bool,

    /// Record safecopy timing files per stage
    #[arg(long, default_value_t = false)]
    pub safecopy_timing: bool,

    /// Eject the disc when done
    #[arg(long, default_value_t = false)]
    pub eject: bool,
}

impl RipCommand {
    pub fn options(&self) -> RipOptions {
        RipOptions {
            prefix: self.prefix.clone(),
            resume: self.resume,
            ripper: self.ripper,
            max_track_retries: self.max_track_retries,
            rebuild: self.rebuild,
            rebuild_unique_sectors: self.rebuild_unique_sectors,
            save_temps: self.save_temps,
            safecopy_timing: self.safecopy_timing,
            eject: self.eject,
            device: self.drive.device.clone(),
        }
    }

    pub fn cdparanoia_config(&self) -> CdparanoiaConfig {
        CdparanoiaConfig {
            keep_logs: self.save_temps,
            ..self.drive.cdparanoia_config()
        }
    }

    pub fn safecopy_config(&self) -> SafecopyConfig {
        SafecopyConfig {
            device: self.drive.device.clone(),
        }
    }
}

impl DriveArgs {
    pub fn cdparanoia_config(&self) -> CdparanoiaConfig {
        CdparanoiaConfig {
            device: self.device.clone(),
            sample_offset: self.device_sample_offset,
            max_skip_retries: self.cdparanoia_max_skip_retries,
            force_read_speed: self.force_read_speed,
            keep_logs: false,
        }
    }
}

/// Queries the drive and prints its table of contents as a cue sheet.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
pub struct QueryCommand {
    #[command(flatten)]
    pub drive: DriveArgs,

    /// File name the printed cue sheet refers to
    #[arg(long, default_value = "disc.bin")]
    pub bin_name: String,
}
