use crate::commands::{Cli, Commands};
use crate::cue::models::CueSheet;
use crate::rip::make_bin_cue;
use crate::tools::DriveReader;
use crate::tools::cdparanoia::Cdparanoia;
use crate::tools::safecopy::Safecopy;
use anyhow::Result;
use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, debug};

mod cd;
mod commands;
mod cue;
mod rip;
mod tools;

pub mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    let logger = env_logger::builder()
        .filter_level(default_level)
        .parse_default_env()
        .build();

    let level = logger.filter();
    let pb = MultiProgress::new();

    LogWrapper::new(pb.clone(), logger).try_init()?;
    log::set_max_level(level);

    debug!(
        "{} {} ({})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET
    );

    match cli.command {
        Commands::Rip(cmd) => {
            let reader = Cdparanoia::new(cmd.cdparanoia_config());
            let copier = Safecopy::new(cmd.safecopy_config());
            make_bin_cue(&cmd.options(), &reader, &copier, &pb).await?
        }
        Commands::Query(cmd) => {
            let reader = Cdparanoia::new(cmd.drive.cdparanoia_config());
            let layout = reader.query().await?;
            print!("{}", CueSheet::from_layout(&layout, &cmd.bin_name));
        }
    }

    Ok(())
}
