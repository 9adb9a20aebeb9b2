use crate::cd::{DiscLayout, Msf};
use crate::cue::error::{CueError, CueResult};
use crate::cue::models::{CueFile, CueSheet, FileType, Index, Track, TrackFlags, TrackType};
use std::fmt;
use std::path::{Path, PathBuf};

pub mod error;
pub mod models;

const INDENT: &str = "  ";

pub struct CueParser {
    cue_path: PathBuf,
}

impl CueParser {
    pub fn new(cue_path: impl AsRef<Path>) -> Self {
        Self {
            cue_path: cue_path.as_ref().to_path_buf(),
        }
    }

    pub async fn parse(&self) -> CueResult<CueSheet> {
        let data = tokio::fs::read_to_string(&self.cue_path).await?;
        self.parse_content(&data)
    }

    pub fn parse_content(&self, content: &str) -> CueResult<CueSheet> {
        let mut cue_sheet = CueSheet {
            files: Vec::new(),
            tracks: Vec::new(),
            leadout: None,
        };

        let mut current_track: Option<Track> = None;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if let ["REM", "LEADOUT", position] = parts.as_slice() {
                cue_sheet.leadout = Some(position.parse()?);
                continue;
            }
            if line.starts_with("REM") {
                continue;
            }

            match parts[0] {
                "FILE" => {
                    if let Some(track) = current_track.take() {
                        cue_sheet.tracks.push(track);
                    }

                    let filename = self.extract_quoted_string(line)?;
                    let file_type = match parts.last() {
                        Some(type_str) => self.parse_file_type(type_str)?,
                        None => return Err(CueError::UnsupportedLine(line.to_string())),
                    };

                    cue_sheet.files.push(CueFile {
                        filename,
                        file_type,
                    });
                }
                "TRACK" => {
                    if let Some(track) = current_track.take() {
                        cue_sheet.tracks.push(track);
                    }
                    if parts.len() != 3 {
                        return Err(CueError::UnsupportedLine(line.to_string()));
                    }

                    let number = parts[1].parse::<u8>()?;
                    let Ok(expected) = u8::try_from(cue_sheet.tracks.len() + 1) else {
                        return Err(CueError::UnsupportedLine(line.to_string()));
                    };
                    if number != expected {
                        return Err(CueError::TrackOutOfOrder {
                            expected,
                            found: number,
                        });
                    }
                    let track_type = self.parse_track_type(parts[2])?;

                    current_track = Some(Track {
                        number,
                        track_type,
                        flags: TrackFlags::default(),
                        indices: Vec::new(),
                        pregap: None,
                        postgap: None,
                    });
                }
                "INDEX" if parts.len() == 3 => {
                    if let Some(track) = &mut current_track {
                        let number = parts[1].parse::<u8>()?;
                        let position = parts[2].parse::<Msf>()?;

                        track.indices.push(Index { number, position });
                    }
                }
                "FLAGS" => {
                    if let Some(track) = &mut current_track {
                        track.flags = self.parse_flags(&parts[1..])?;
                    }
                }
                "PREGAP" if parts.len() == 2 => {
                    if let Some(track) = &mut current_track {
                        track.pregap = Some(parts[1].parse()?);
                    }
                }
                "POSTGAP" if parts.len() == 2 => {
                    if let Some(track) = &mut current_track {
                        track.postgap = Some(parts[1].parse()?);
                    }
                }
                // Metadata is carried by the tagging tools, not by this layout.
                "TITLE" | "PERFORMER" | "SONGWRITER" | "COMPOSER" | "ARRANGER" | "MESSAGE"
                | "CATALOG" | "ISRC" | "DISC_ID" | "CDTEXTFILE" => {}
                _ => return Err(CueError::UnsupportedLine(line.to_string())),
            }
        }

        if let Some(track) = current_track {
            cue_sheet.tracks.push(track);
        }

        Ok(cue_sheet)
    }

    fn extract_quoted_string(&self, line: &str) -> CueResult<String> {
        let start = line.find('"').ok_or(CueError::MissingQuoteError(
            "Missing opening quote".to_string(),
        ))?;
        let end = line.rfind('"').ok_or(CueError::MissingQuoteError(
            "Missing closing quote".to_string(),
        ))?;
        if start >= end {
            return Err(CueError::InvalidQuotedString(line.to_string()));
        }

        Ok(line[start + 1..end].to_string())
    }

    fn parse_file_type(&self, type_str: &str) -> CueResult<FileType> {
        match type_str {
            "BINARY" => Ok(FileType::Binary),
            "MOTOROLA" => Ok(FileType::Motorola),
            "WAVE" => Ok(FileType::Wave),
            "MP3" => Ok(FileType::Mp3),
            _ => Err(CueError::InvalidFileType(type_str.to_string())),
        }
    }

    fn parse_track_type(&self, type_str: &str) -> CueResult<TrackType> {
        match type_str {
            "AUDIO" => Ok(TrackType::Audio),
            "MODE1/2352" => Ok(TrackType::Mode1_2352),
            _ => Err(CueError::InvalidTrackType(type_str.to_string())),
        }
    }

    fn parse_flags(&self, flags: &[&str]) -> CueResult<TrackFlags> {
        let mut parsed = TrackFlags::default();
        for flag in flags {
            match *flag {
                "DCP" => parsed.copy_permitted = true,
                "4CH" => parsed.four_channels = true,
                "PRE" => parsed.pre_emphasis = true,
                _ => return Err(CueError::UnsupportedFlag(flag.to_string())),
            }
        }
        Ok(parsed)
    }
}

impl CueSheet {
    /// Describes a single raw image holding every track of `layout`.
    pub fn from_layout(layout: &DiscLayout, bin_filename: &str) -> Self {
        let tracks = layout
            .tracks()
            .iter()
            .zip(layout.track_numbers())
            .map(|(track, number)| Track {
                number,
                track_type: TrackType::Audio,
                flags: TrackFlags {
                    copy_permitted: track.copy_permitted,
                    four_channels: track.audio_channels == 4,
                    pre_emphasis: track.pre_emphasis,
                },
                indices: vec![Index {
                    number: 1,
                    position: track.begin,
                }],
                pregap: None,
                postgap: None,
            })
            .collect();

        Self {
            files: vec![CueFile {
                filename: bin_filename.to_string(),
                file_type: FileType::Binary,
            }],
            tracks,
            leadout: layout.leadout(),
        }
    }

    /// Track lengths are not recorded in a cue sheet, so they come back as
    /// unknown.
    pub fn to_layout(&self) -> CueResult<DiscLayout> {
        if self.tracks.is_empty() {
            return Err(CueError::NoTracks);
        }

        let tracks = self
            .tracks
            .iter()
            .map(|track| {
                let begin = track
                    .index(1)
                    .ok_or(CueError::MissingIndex(track.number))?
                    .position;
                Ok(crate::cd::Track {
                    begin,
                    length: None,
                    copy_permitted: track.flags.copy_permitted,
                    pre_emphasis: track.flags.pre_emphasis,
                    audio_channels: if track.flags.four_channels { 4 } else { 2 },
                })
            })
            .collect::<CueResult<Vec<_>>>()?;

        Ok(DiscLayout::new(tracks, self.leadout))
    }
}

impl fmt::Display for CueSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Every track of a raw image lives in the first (and only) file.
        if let Some(file) = self.files.first() {
            writeln!(f, "FILE \"{}\" {}", file.filename, file.file_type.as_str())?;
        }
        for track in &self.tracks {
            writeln!(
                f,
                "{INDENT}TRACK {:02} {}",
                track.number,
                track.track_type.as_str()
            )?;
            if !track.flags.is_empty() {
                let mut flags = Vec::new();
                if track.flags.copy_permitted {
                    flags.push("DCP");
                }
                if track.flags.four_channels {
                    flags.push("4CH");
                }
                if track.flags.pre_emphasis {
                    flags.push("PRE");
                }
                writeln!(f, "{INDENT}{INDENT}FLAGS {}", flags.join(" "))?;
            }
            if let Some(pregap) = track.pregap {
                writeln!(f, "{INDENT}{INDENT}PREGAP {pregap}")?;
            }
            for index in &track.indices {
                writeln!(
                    f,
                    "{INDENT}{INDENT}INDEX {:02} {}",
                    index.number, index.position
                )?;
            }
            if let Some(postgap) = track.postgap {
                writeln!(f, "{INDENT}{INDENT}POSTGAP {postgap}")?;
            }
        }
        if let Some(leadout) = self.leadout {
            writeln!(f, "REM LEADOUT {leadout}")?;
        }
        Ok(())
    }
}
