use crate::cd::SECTOR_SIZE;
use crate::rip::RipOptions;
use crate::rip::error::{RipError, RipResult};
use crate::rip::files::SessionFiles;
use crate::rip::tracks::SessionState;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Occurrence counts of the distinct contents one sector had across attempts,
/// in the order each content was first seen.
#[derive(Debug, Default)]
pub struct SectorTally<'a> {
    votes: Vec<(&'a [u8], usize)>,
}

impl<'a> SectorTally<'a> {
    pub fn from_reads(reads: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut tally = Self::default();
        for data in reads {
            tally.add(data);
        }
        tally
    }

    pub fn add(&mut self, data: &'a [u8]) {
        match self.votes.iter_mut().find(|(seen, _)| *seen == data) {
            Some((_, count)) => *count += 1,
            None => self.votes.push((data, 1)),
        }
    }

    /// Most common content; on equal counts the earliest seen wins.
    pub fn winner(&self) -> Option<(&'a [u8], usize)> {
        let mut best: Option<(&'a [u8], usize)> = None;
        for &(data, count) in &self.votes {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((data, count));
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebuildReport {
    pub sectors: u64,
    /// Mean of winner count / attempt count over all sectors.
    pub certainty: f64,
    /// Sectors accepted from a single read.
    pub low_certainty_sectors: Vec<u64>,
}

/// Writes the per-sector majority of `attempts` to `output`.
///
/// A sector no two attempts agree on fails the rebuild unless
/// `accept_unique` is set; `output` is removed on failure.
pub async fn rebuild_track(
    track_no: u8,
    attempts: &[PathBuf],
    output: &Path,
    accept_unique: bool,
) -> RipResult<RebuildReport> {
    let Some(first) = attempts.first() else {
        return Err(RipError::MissingTrack(track_no));
    };

    let size = fs::metadata(first).await?.len();
    for other in &attempts[1..] {
        let other_size = fs::metadata(other).await?.len();
        if other_size != size {
            return Err(RipError::InconsistentAttemptSizes {
                path: other.clone(),
                size: other_size,
                expected_path: first.clone(),
                expected: size,
            });
        }
    }
    if size % SECTOR_SIZE as u64 != 0 {
        return Err(RipError::UnalignedTrackSize {
            path: first.clone(),
            size,
            sector_size: SECTOR_SIZE,
        });
    }

    let sectors = size / SECTOR_SIZE as u64;
    let result = write_consensus(track_no, attempts, output, sectors, accept_unique).await;
    if result.is_err() {
        let _ = fs::remove_file(output).await;
    }
    let report = result?;
    warn!("Final certainty is {:.2}%.", report.certainty * 100.0);
    Ok(report)
}

async fn write_consensus(
    track_no: u8,
    attempts: &[PathBuf],
    output: &Path,
    sectors: u64,
    accept_unique: bool,
) -> RipResult<RebuildReport> {
    let mut readers = Vec::with_capacity(attempts.len());
    for path in attempts {
        debug!("Reading {path:?}...");
        readers.push(BufReader::new(File::open(path).await?));
    }
    let mut writer = BufWriter::new(File::create(output).await?);
    let mut buffers = vec![vec![0u8; SECTOR_SIZE]; attempts.len()];

    let n = attempts.len();
    let mut total = 0.0;
    let mut low_certainty_sectors = Vec::new();

    for sector in 0..sectors {
        for (reader, buf) in readers.iter_mut().zip(buffers.iter_mut()) {
            reader.read_exact(buf).await?;
        }
        let tally = SectorTally::from_reads(buffers.iter().map(Vec::as_slice));
        let Some((data, count)) = tally.winner() else {
            return Err(RipError::MissingTrack(track_no));
        };
        let share = count as f64 / n as f64;
        total += share;

        if count <= 1 {
            if !accept_unique {
                return Err(RipError::LowCertaintySector {
                    track_no,
                    sector,
                    count,
                    attempts: n,
                });
            }
            warn!("... sector {sector} is only certain at {:.1}% ({count}/{n})", share * 100.0);
            low_certainty_sectors.push(sector);
        } else if count + 1 < n {
            warn!("... sector {sector} is only certain at {:.1}% ({count}/{n})", share * 100.0);
        }
        writer.write_all(data).await?;
    }
    writer.flush().await?;

    Ok(RebuildReport {
        sectors,
        certainty: if sectors == 0 { 1.0 } else { total / sectors as f64 },
        low_certainty_sectors,
    })
}

/// Settles every still-unresolved track from its retained attempts.
pub async fn rebuild_remaining(
    state: &mut SessionState,
    files: &SessionFiles,
    options: &RipOptions,
) -> RipResult<()> {
    for track_no in state.todo_tracks() {
        let attempts: Vec<PathBuf> = state
            .attempts(track_no)
            .iter()
            .map(|attempt| attempt.path.clone())
            .collect();
        if attempts.is_empty() {
            warn!("Track {track_no}: no attempts to rebuild from.");
            continue;
        }

        let rebuilt = files.rebuild_track(track_no);
        info!("Rebuilding {rebuilt:?}...");
        rebuild_track(track_no, &attempts, &rebuilt, options.rebuild_unique_sectors).await?;

        let track_file = files.track(track_no);
        fs::rename(&rebuilt, &track_file).await?;
        if !options.save_temps {
            for path in &attempts {
                fs::remove_file(path).await?;
            }
        }
        state.mark_done(track_no, track_file);
    }
    Ok(())
}
