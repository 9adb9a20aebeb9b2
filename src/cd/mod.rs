// src/cd/mod.rs
pub mod error;
pub mod layout;
pub mod msf;
pub mod range;

pub use layout::{DiscLayout, Track};
pub use msf::Msf;
pub use range::{TrackRange, consecutive_ranges};

pub const SECTOR_SIZE: usize = 2352;
pub const CHANNELS: u64 = 2;
pub const SAMPLE_BITS: u64 = 16;
pub const SAMPLE_RATE: u64 = 44_100;
pub const BYTES_PER_SAMPLE: u64 = CHANNELS * SAMPLE_BITS / 8;
pub const BYTES_PER_SECOND: u64 = SAMPLE_RATE * BYTES_PER_SAMPLE;

// 1 timecode frame = 1 sector
pub const FRAMES_PER_SECOND: u32 = (BYTES_PER_SECOND / SECTOR_SIZE as u64) as u32;

/// Nominal transfer rate of a 1x drive, in bytes/second.
pub const SPEED_1X: u64 = BYTES_PER_SECOND;
