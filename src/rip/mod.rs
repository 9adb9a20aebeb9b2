//! Turns the disc in the drive into `<prefix>.bin` plus `<prefix>.cue`.

use crate::cd::DiscLayout;
use crate::cue::CueParser;
use crate::cue::models::CueSheet;
use crate::rip::assemble::combine_tracks;
use crate::rip::error::{RipError, RipResult};
use crate::rip::files::SessionFiles;
use crate::rip::rebuild::rebuild_remaining;
use crate::rip::staged::StagedCopier;
use crate::rip::throughput::Throughput;
use crate::rip::tracks::TrackRipper;
use crate::tools::eject::eject;
use crate::tools::{BadBlockCopier, DriveReader};
use clap::ValueEnum;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub mod assemble;
pub mod error;
pub mod files;
pub mod rebuild;
pub mod staged;
pub mod throughput;
pub mod tracks;

#[cfg(test)]
pub mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Ripper {
    /// Per-track reads, retried until two agree
    Cdparanoia,
    /// Whole-disc raw copy in escalating stages
    Safecopy,
}

#[derive(Debug, Clone)]
pub struct RipOptions {
    pub prefix: PathBuf,
    pub resume: bool,
    pub ripper: Ripper,
    /// Shared by every track; unlimited when unset.
    pub max_track_retries: Option<u32>,
    pub rebuild: bool,
    pub rebuild_unique_sectors: bool,
    pub save_temps: bool,
    pub safecopy_timing: bool,
    pub eject: bool,
    pub device: String,
}

/// Reads the layout back from the session cue sheet, or queries the drive
/// and writes one.
pub async fn load_layout<R: DriveReader>(
    reader: &R,
    files: &SessionFiles,
    resume: bool,
) -> RipResult<DiscLayout> {
    let cue_file = files.cue();
    if fs::try_exists(&cue_file).await? {
        if !resume {
            return Err(RipError::OutputExists(cue_file));
        }
        info!("... CONTINUE: {cue_file:?} file exists.");
        let sheet = CueParser::new(&cue_file).parse().await?;
        return Ok(sheet.to_layout()?);
    }

    info!("Querying the drive...");
    let layout = reader.query().await?;
    for track_no in layout.track_numbers() {
        if let (Some(track), Some(length)) = (layout.track(track_no), layout.track_length(track_no)) {
            debug!(
                "Track {track_no:02}: begin {} length {} ({:.1}s)",
                track.begin,
                length,
                length.seconds()
            );
        }
    }
    let sheet = CueSheet::from_layout(&layout, &files.bin_name());
    fs::write(&cue_file, sheet.to_string()).await?;
    info!("{cue_file:?}: {} track(s) written.", layout.len());
    Ok(layout)
}

/// Runs one complete extraction session.
pub async fn make_bin_cue<R: DriveReader, C: BadBlockCopier>(
    options: &RipOptions,
    reader: &R,
    copier: &C,
    progress: &MultiProgress,
) -> RipResult<()> {
    let files = SessionFiles::new(&options.prefix);
    let bin_file = files.bin();
    if fs::try_exists(&bin_file).await? && !options.resume {
        return Err(RipError::OutputExists(bin_file));
    }
    let layout = load_layout(reader, &files, options.resume).await?;

    info!("Creating {bin_file:?}...");
    match options.ripper {
        Ripper::Safecopy => {
            StagedCopier::new(copier, &files, &layout, options, progress)
                .copy()
                .await?;
        }
        Ripper::Cdparanoia => {
            let ripper = TrackRipper::new(reader, &files, options, progress);
            let mut state = ripper.init_state(layout.track_numbers()).await?;
            ripper.rip(&mut state).await?;

            if !state.is_complete() && options.rebuild {
                rebuild_remaining(&mut state, &files, options).await?;
            }
            if !state.is_complete() {
                return Err(RipError::RetriesExhausted(state.unresolved()));
            }
            log_speed("Overall", &state.throughput);

            let track_count = *layout.track_numbers().end();
            combine_tracks(&bin_file, track_count, &state.done_files(), options.save_temps).await?;
        }
    }

    if options.eject {
        eject(&options.device).await?;
    }
    info!("DONE!");
    Ok(())
}

pub(crate) fn log_speed(label: &str, throughput: &Throughput) {
    if let Some(speed) = throughput.speed() {
        info!("{label} Speed: {speed:.1}x");
    }
}

/// Spinner shown while an external program owns the drive.
pub(crate) fn step_spinner(progress: &MultiProgress, message: String) -> ProgressBar {
    let spinner = progress.add(ProgressBar::new_spinner());
    let style = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub(crate) async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cd::{Msf, SECTOR_SIZE, Track};
    use crate::rip::testing::{FakeCopier, FakeDrive, options, quiet_progress};
    use crate::tools::safecopy::{CopyReport, Stage};

    const TRACK1_SECTORS: u32 = 16503;
    const TRACK2_SECTORS: u32 = 300;

    fn two_track_disc() -> DiscLayout {
        DiscLayout::new(
            vec![
                Track::new(Msf::ZERO, Some(Msf::from_frames(TRACK1_SECTORS))),
                Track::new(
                    Msf::from_frames(TRACK1_SECTORS),
                    Some(Msf::from_frames(TRACK2_SECTORS)),
                ),
            ],
            None,
        )
    }

    fn track_audio(track_no: u8, _read: u32) -> Vec<u8> {
        let sectors = if track_no == 1 { TRACK1_SECTORS } else { TRACK2_SECTORS };
        vec![track_no; sectors as usize * SECTOR_SIZE]
    }

    #[tokio::test]
    async fn two_track_disc_becomes_one_image() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path().join("album"));
        let drive = FakeDrive::with_layout(two_track_disc(), track_audio);
        let copier = FakeCopier::new(0, CopyReport::default());

        make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap();

        let files = SessionFiles::new(&options.prefix);
        let image = fs::read(files.bin()).await.unwrap();
        assert_eq!(
            image.len(),
            (TRACK1_SECTORS + TRACK2_SECTORS) as usize * SECTOR_SIZE
        );
        let split = TRACK1_SECTORS as usize * SECTOR_SIZE;
        assert!(image[..split].iter().all(|&b| b == 1));
        assert!(image[split..].iter().all(|&b| b == 2));
        assert!(!fs::try_exists(files.track(1)).await.unwrap());

        let cue = fs::read_to_string(files.cue()).await.unwrap();
        assert!(cue.starts_with("FILE \"album.bin\" BINARY\n"));
        assert!(cue.contains("TRACK 02 AUDIO"));
        assert!(cue.contains("INDEX 01 03:40:03"));
    }

    #[tokio::test]
    async fn unresolved_tracks_give_up_with_their_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path().join("album"));
        options.max_track_retries = Some(2);
        let drive = FakeDrive::new(3, |track_no, read| vec![track_no.wrapping_add(read as u8); 2352]);
        let copier = FakeCopier::new(0, CopyReport::default());

        let err = make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Giving up; still more tracks to retry: 1-3 (use --rebuild option?)"
        );
    }

    #[tokio::test]
    async fn rebuild_settles_what_retries_could_not() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path().join("album"));
        options.max_track_retries = Some(3);
        options.rebuild = true;
        // Second sector differs on every read, first sector never does.
        let drive = FakeDrive::new(1, |_, read| {
            let mut data = vec![0u8; 2 * SECTOR_SIZE];
            data[SECTOR_SIZE] = read as u8;
            data
        });
        let copier = FakeCopier::new(0, CopyReport::default());

        let err = make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, RipError::LowCertaintySector { sector: 1, .. }));

        options.resume = true;
        options.rebuild_unique_sectors = true;
        make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap();

        let files = SessionFiles::new(&options.prefix);
        let image = fs::read(files.bin()).await.unwrap();
        assert_eq!(image.len(), 2 * SECTOR_SIZE);
    }

    #[tokio::test]
    async fn fresh_session_refuses_existing_cue() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path().join("album"));
        let files = SessionFiles::new(&options.prefix);
        fs::write(files.cue(), "FILE \"album.bin\" BINARY\n").await.unwrap();
        let drive = FakeDrive::new(1, |_, _| vec![0; 2352]);

        let err = load_layout(&drive, &files, false).await.unwrap_err();

        assert!(matches!(err, RipError::OutputExists(path) if path == files.cue()));
        assert_eq!(drive.queries(), 0);
    }

    #[tokio::test]
    async fn continued_session_reads_layout_from_cue() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path().join("album"));
        let files = SessionFiles::new(&options.prefix);
        let drive = FakeDrive::with_layout(two_track_disc(), track_audio);

        let queried = load_layout(&drive, &files, false).await.unwrap();
        let reread = load_layout(&drive, &files, true).await.unwrap();

        assert_eq!(drive.queries(), 1);
        assert_eq!(reread.len(), 2);
        assert_eq!(reread.track(2).map(|t| t.begin), queried.track(2).map(|t| t.begin));
        assert_eq!(reread.leadout(), Some(Msf::from_frames(TRACK1_SECTORS + TRACK2_SECTORS)));
    }

    #[tokio::test]
    async fn staged_strategy_writes_image_directly() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path().join("album"));
        options.ripper = Ripper::Safecopy;
        let drive = FakeDrive::with_layout(two_track_disc(), track_audio);
        let size = 2352 * 16803;
        let copier = FakeCopier::new(
            size + 2352,
            CopyReport {
                low_level_disk_size: Some(size),
                blocks_copied: None,
                bytes_copied: None,
            },
        );

        make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap();

        let files = SessionFiles::new(&options.prefix);
        assert_eq!(fs::metadata(files.bin()).await.unwrap().len(), size);
        assert!(drive.calls().is_empty());
    }

    #[tokio::test]
    async fn fresh_session_refuses_existing_image_before_querying() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path().join("album"));
        let files = SessionFiles::new(&options.prefix);
        fs::write(files.bin(), vec![0u8; SECTOR_SIZE]).await.unwrap();
        let drive = FakeDrive::with_layout(two_track_disc(), track_audio);
        let copier = FakeCopier::new(0, CopyReport::default());

        let err = make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, RipError::OutputExists(path) if path == files.bin()));
        assert_eq!(drive.queries(), 0);
        assert!(!fs::try_exists(files.cue()).await.unwrap());
    }

    #[tokio::test]
    async fn continued_staged_session_without_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path().join("album"));
        options.ripper = Ripper::Safecopy;
        options.resume = true;
        let files = SessionFiles::new(&options.prefix);
        let drive = FakeDrive::with_layout(two_track_disc(), track_audio);
        load_layout(&drive, &files, false).await.unwrap();
        fs::write(files.badblocks(Stage::One), "")
            .await
            .unwrap();
        let copier = FakeCopier::new(0, CopyReport::default());

        let err = make_bin_cue(&options, &drive, &copier, &quiet_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, RipError::MissingImage(path) if path == files.bin()));
        assert!(copier.stages().is_empty());
    }
}
