use crate::cd::{TrackRange, consecutive_ranges};
use crate::rip::error::{RipError, RipResult, UnresolvedTracks};
use crate::rip::files::SessionFiles;
use crate::rip::throughput::Throughput;
use crate::rip::{RipOptions, log_speed, step_spinner};
use crate::tools::DriveReader;
use indicatif::MultiProgress;
use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

const READ_CHUNK: usize = 64 * 1024;

pub type ContentDigest = [u8; 32];

/// One retained read of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub try_number: u32,
    pub path: PathBuf,
    pub digest: ContentDigest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackState {
    /// Accepted, content-verified output.
    Done(PathBuf),
    /// Retained attempts, all mutually different.
    Todo(Vec<Attempt>),
}

/// Everything the retry loop mutates, owned by the single control path.
#[derive(Debug, Default)]
pub struct SessionState {
    tracks: BTreeMap<u8, TrackState>,
    pub try_number: u32,
    pub throughput: Throughput,
}

impl SessionState {
    pub fn new(track_numbers: impl IntoIterator<Item = u8>) -> Self {
        Self {
            tracks: track_numbers
                .into_iter()
                .map(|track_no| (track_no, TrackState::Todo(Vec::new())))
                .collect(),
            ..Self::default()
        }
    }

    pub fn state(&self, track_no: u8) -> Option<&TrackState> {
        self.tracks.get(&track_no)
    }

    pub fn is_complete(&self) -> bool {
        self.todo_tracks().is_empty()
    }

    /// Ascending, so it can feed [`consecutive_ranges`].
    pub fn todo_tracks(&self) -> Vec<u8> {
        self.tracks
            .iter()
            .filter(|(_, state)| matches!(state, TrackState::Todo(_)))
            .map(|(track_no, _)| *track_no)
            .collect()
    }

    pub fn attempts(&self, track_no: u8) -> &[Attempt] {
        match self.tracks.get(&track_no) {
            Some(TrackState::Todo(attempts)) => attempts,
            _ => &[],
        }
    }

    pub fn mark_done(&mut self, track_no: u8, path: PathBuf) {
        self.tracks.insert(track_no, TrackState::Done(path));
    }

    pub fn push_attempt(&mut self, track_no: u8, attempt: Attempt) {
        if let Some(TrackState::Todo(attempts)) = self.tracks.get_mut(&track_no) {
            attempts.push(attempt);
        }
    }

    pub fn done_files(&self) -> BTreeMap<u8, PathBuf> {
        self.tracks
            .iter()
            .filter_map(|(track_no, state)| match state {
                TrackState::Done(path) => Some((*track_no, path.clone())),
                TrackState::Todo(_) => None,
            })
            .collect()
    }

    pub fn unresolved(&self) -> UnresolvedTracks {
        UnresolvedTracks(consecutive_ranges(self.todo_tracks()))
    }
}

/// Rips tracks until two reads of each agree, or the retry budget runs out.
pub struct TrackRipper<'a, R> {
    reader: &'a R,
    files: &'a SessionFiles,
    options: &'a RipOptions,
    progress: &'a MultiProgress,
}

impl<'a, R: DriveReader> TrackRipper<'a, R> {
    pub fn new(
        reader: &'a R,
        files: &'a SessionFiles,
        options: &'a RipOptions,
        progress: &'a MultiProgress,
    ) -> Self {
        Self {
            reader,
            files,
            options,
            progress,
        }
    }

    /// Fresh state for `track_numbers`; tracks whose accepted output is
    /// already on disk are done when resuming.
    pub async fn init_state(
        &self,
        track_numbers: impl IntoIterator<Item = u8>,
    ) -> RipResult<SessionState> {
        let mut state = SessionState::new(track_numbers);
        for track_no in state.todo_tracks() {
            let track_file = self.files.track(track_no);
            if fs::try_exists(&track_file).await? {
                if !self.options.resume {
                    return Err(RipError::OutputExists(track_file));
                }
                info!("... CONTINUE: {track_file:?} file exists.");
                state.mark_done(track_no, track_file);
            }
        }
        Ok(state)
    }

    /// Retry loop. Returns once every track is done or the budget (shared by
    /// all tracks) is spent; leftovers stay `Todo` for the caller.
    pub async fn rip(&self, state: &mut SessionState) -> RipResult<()> {
        while !state.is_complete()
            && self
                .options
                .max_track_retries
                .is_none_or(|max| state.try_number < max)
        {
            state.try_number += 1;
            let try_number = state.try_number;

            let mut to_rip = Vec::new();
            for track_no in state.todo_tracks() {
                let try_file = self.files.try_track(track_no, try_number);
                if self.options.resume && fs::try_exists(&try_file).await? {
                    info!("... CONTINUE: {try_file:?} file exists.");
                } else {
                    to_rip.push(track_no);
                }
            }

            for range in consecutive_ranges(to_rip) {
                info!(
                    "Try {try_number}. Ripping track{} {range}...{}",
                    if range.is_single() { "" } else { "s" },
                    if try_number > 2 && self.options.max_track_retries.is_none() {
                        " (limit with --max-track-retries option)"
                    } else {
                        ""
                    }
                );
                state.throughput += self.rip_range(range, try_number).await?;
            }

            self.reconcile(state, try_number).await?;
        }
        Ok(())
    }

    async fn rip_range(&self, range: TrackRange, try_number: u32) -> RipResult<Throughput> {
        let spinner = step_spinner(
            self.progress,
            format!("Try {try_number}: ripping track(s) {range}"),
        );
        let started = Instant::now();
        let result = self
            .reader
            .rip(range, &self.files.try_prefix(try_number))
            .await;
        let elapsed = started.elapsed();
        spinner.finish_and_clear();

        if let Err(source) = result {
            error!("Ripping track(s) {range} failed: {source}");
            self.remove_incomplete(range, try_number).await;
            return Err(RipError::ReaderInvocationFailed { range, source });
        }

        let mut bytes = 0;
        for track_no in range.tracks() {
            bytes += fs::metadata(self.files.try_track(track_no, try_number))
                .await?
                .len();
        }
        let throughput = Throughput::new(bytes, elapsed);
        log_speed("Track(s)", &throughput);
        Ok(throughput)
    }

    /// The reader writes the run's tracks in order, so only the last file
    /// present can be partial.
    async fn remove_incomplete(&self, range: TrackRange, try_number: u32) {
        for track_no in range.tracks().rev() {
            let try_file = self.files.try_track(track_no, try_number);
            if fs::try_exists(&try_file).await.unwrap_or(false) {
                warn!("{try_file:?}: Possibly incomplete; Removing...");
                if let Err(err) = fs::remove_file(&try_file).await {
                    error!("{try_file:?}: {err}");
                }
                break;
            }
            debug!("{try_file:?}: does not exist...");
        }
    }

    /// Compares this try's file of every unresolved track with its retained
    /// attempts; the first identical one settles the track.
    async fn reconcile(&self, state: &mut SessionState, try_number: u32) -> RipResult<()> {
        for track_no in state.todo_tracks() {
            let try_file = self.files.try_track(track_no, try_number);
            let digest = hash_file(&try_file).await?;
            debug!("{try_file:?}: SHA-256 = {}", hex::encode(digest));

            let mut matched = None;
            for attempt in state.attempts(track_no) {
                if attempt.path == try_file || attempt.digest != digest {
                    continue;
                }
                if files_identical(&attempt.path, &try_file).await? {
                    matched = Some(attempt.path.clone());
                    break;
                }
                warn!("{try_file:?}: same digest as {:?} but different content", attempt.path);
            }

            match matched {
                Some(same) => {
                    info!("{try_file:?}: same as {same:?}. DONE");
                    let accepted = if self.options.save_temps {
                        try_file
                    } else {
                        let track_file = self.files.track(track_no);
                        fs::rename(&try_file, &track_file).await?;
                        for attempt in state.attempts(track_no) {
                            fs::remove_file(&attempt.path).await?;
                        }
                        track_file
                    };
                    state.mark_done(track_no, accepted);
                }
                None => {
                    if !state.attempts(track_no).is_empty() {
                        warn!("{try_file:?}: all other track files differ; Will retry.");
                    }
                    state.push_attempt(
                        track_no,
                        Attempt {
                            try_number,
                            path: try_file,
                            digest,
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

pub async fn hash_file(path: &Path) -> std::io::Result<ContentDigest> {
    let mut reader = BufReader::new(File::open(path).await?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

pub async fn files_identical(a: &Path, b: &Path) -> std::io::Result<bool> {
    if fs::metadata(a).await?.len() != fs::metadata(b).await?.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a).await?);
    let mut reader_b = BufReader::new(File::open(b).await?);
    let mut buf_a = vec![0u8; READ_CHUNK];
    let mut buf_b = vec![0u8; READ_CHUNK];
    loop {
        let n = fill(&mut reader_a, &mut buf_a).await?;
        let m = fill(&mut reader_b, &mut buf_b).await?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Reads until `buf` is full or EOF; returns the byte count.
async fn fill<T: AsyncRead + Unpin>(reader: &mut T, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
