use crate::commands::rip::{QueryCommand, RipCommand};
use clap::{Parser, Subcommand};

pub mod rip;

/// CLI for extracting audio CDs into verified BIN/CUE images.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output (command lines, hashes, tool transcripts)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Rip(RipCommand),
    Query(QueryCommand),
}
