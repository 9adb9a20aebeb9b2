use crate::cd::DiscLayout;
use crate::rip::error::{RipError, RipResult};
use crate::rip::files::SessionFiles;
use crate::rip::throughput::Throughput;
use crate::rip::{RipOptions, log_speed, remove_if_exists, step_spinner};
use crate::tools::BadBlockCopier;
use crate::tools::safecopy::{CopyReport, Stage, StageRequest};
use indicatif::MultiProgress;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, OpenOptions};

/// Copies the whole device into the session image with escalating stages,
/// each one retrying only what the previous one could not read.
pub struct StagedCopier<'a, C> {
    copier: &'a C,
    files: &'a SessionFiles,
    layout: &'a DiscLayout,
    options: &'a RipOptions,
    progress: &'a MultiProgress,
}

impl<'a, C: BadBlockCopier> StagedCopier<'a, C> {
    pub fn new(
        copier: &'a C,
        files: &'a SessionFiles,
        layout: &'a DiscLayout,
        options: &'a RipOptions,
        progress: &'a MultiProgress,
    ) -> Self {
        Self {
            copier,
            files,
            layout,
            options,
            progress,
        }
    }

    /// A stage finished in an earlier session when its range file is on disk.
    pub async fn stage_done(&self, stage: Stage) -> RipResult<bool> {
        Ok(self.options.resume && fs::try_exists(self.files.badblocks(stage)).await?)
    }

    fn range_files(&self) -> [PathBuf; 4] {
        [
            self.files.badblocks(Stage::One),
            self.files.badblocks(Stage::Two),
            self.files.badblocks(Stage::Three),
            self.files.stage3_old_badblocks(),
        ]
    }

    pub async fn copy(&self) -> RipResult<Throughput> {
        if !self.options.resume {
            for path in self.range_files() {
                remove_if_exists(&path).await?;
            }
        }

        let mut total = Throughput::default();
        let mut first_report: Option<CopyReport> = None;
        let mut input: Option<PathBuf> = None;
        let mut stage = Stage::One;

        loop {
            let output = self.files.badblocks(stage);
            let run = if self.stage_done(stage).await? {
                info!("... CONTINUE: {output:?} file exists.");
                if stage == Stage::Three {
                    // Never overwrite the previous stage 3 result; retry from it.
                    let old = self.files.stage3_old_badblocks();
                    fs::rename(&output, &old).await?;
                    input = Some(old);
                    true
                } else {
                    false
                }
            } else {
                true
            };

            if run {
                let (report, throughput) = self.run_stage(stage, input.as_deref(), &output).await?;
                total += throughput;
                first_report.get_or_insert(report);
            }

            if fs::metadata(&output).await?.len() == 0 {
                break;
            }
            match stage.next() {
                Some(next) => {
                    input = Some(output);
                    stage = next;
                }
                None => return Err(RipError::StageThreeIncomplete(output)),
            }
        }
        log_speed("Overall", &total);

        let bin_file = self.files.bin();
        if !fs::try_exists(&bin_file).await? {
            return Err(RipError::MissingImage(bin_file));
        }

        if !self.options.save_temps {
            for path in self.range_files() {
                remove_if_exists(&path).await?;
            }
        }

        // Stages reused from an earlier session leave no report behind.
        let expected = first_report
            .and_then(|report| report.low_level_disk_size)
            .or_else(|| self.layout.leadout().map(|leadout| leadout.bytes()));
        if let Some(expected) = expected {
            fit_to_size(&bin_file, expected).await?;
        }
        Ok(total)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        input: Option<&Path>,
        output: &Path,
    ) -> RipResult<(CopyReport, Throughput)> {
        let destination = self.files.bin();
        let timing = self
            .options
            .safecopy_timing
            .then(|| self.files.timing(stage));
        let request = StageRequest {
            stage,
            destination: &destination,
            input_badblocks: input,
            output_badblocks: output,
            timing: timing.as_deref(),
        };

        info!("{stage}: copying to {destination:?}...");
        let spinner = step_spinner(self.progress, format!("{stage}: copying"));
        let started = Instant::now();
        let result = self.copier.copy_stage(&request).await;
        spinner.finish_and_clear();
        let report = result?;

        if !fs::try_exists(output).await? {
            return Err(RipError::StageOutputMissing {
                stage,
                path: output.to_path_buf(),
            });
        }

        let throughput = Throughput::new(report.bytes_copied.unwrap_or(0), started.elapsed());
        log_speed(&stage.to_string(), &throughput);
        Ok((report, throughput))
    }
}

/// Shorter than `expected` is fatal; anything past it is dropped.
pub async fn fit_to_size(path: &Path, expected: u64) -> RipResult<()> {
    let size = fs::metadata(path).await?.len();
    if size < expected {
        return Err(RipError::TruncatedImage {
            path: path.to_path_buf(),
            size,
            expected,
        });
    }
    if size > expected {
        info!("Truncating {path:?} to {expected} bytes...");
        let file = OpenOptions::new().write(true).open(path).await?;
        file.set_len(expected).await?;
    }
    Ok(())
}
