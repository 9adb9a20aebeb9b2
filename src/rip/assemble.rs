use crate::rip::error::{RipError, RipResult};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{self, AsyncWriteExt, BufWriter};

/// Concatenates the accepted output of tracks `1..=track_count` into `target`.
pub async fn combine_tracks(
    target: &Path,
    track_count: u8,
    track_files: &BTreeMap<u8, PathBuf>,
    keep_inputs: bool,
) -> RipResult<u64> {
    let mut inputs = Vec::with_capacity(track_count as usize);
    for track_no in 1..=track_count {
        let path = track_files
            .get(&track_no)
            .ok_or(RipError::MissingTrack(track_no))?;
        inputs.push(path);
    }

    info!("{target:?}: Combining tracks...");
    let mut writer = BufWriter::new(File::create(target).await?);
    let mut written = 0;
    for path in &inputs {
        debug!("Appending {path:?}...");
        let mut reader = File::open(path).await?;
        written += io::copy(&mut reader, &mut writer).await?;
    }
    writer.flush().await?;

    if !keep_inputs {
        for path in inputs {
            fs::remove_file(path).await?;
        }
    }
    Ok(written)
}
