// src/cue/models
use crate::cd::Msf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSheet {
    pub files: Vec<CueFile>,
    pub tracks: Vec<Track>,
    /// Written as `REM LEADOUT mm:ss:ff`; other `REM` lines are ignored.
    pub leadout: Option<Msf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueFile {
    pub filename: String,
    pub file_type: FileType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub number: u8,
    pub track_type: TrackType,
    pub flags: TrackFlags,
    pub indices: Vec<Index>,
    pub pregap: Option<Msf>,
    pub postgap: Option<Msf>,
}

impl Track {
    pub fn index(&self, number: u8) -> Option<&Index> {
        self.indices.iter().find(|i| i.number == number)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackFlags {
    /// DCP
    pub copy_permitted: bool,
    /// 4CH
    pub four_channels: bool,
    /// PRE
    pub pre_emphasis: bool,
}

impl TrackFlags {
    pub fn is_empty(&self) -> bool {
        !(self.copy_permitted || self.four_channels || self.pre_emphasis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub number: u8,
    pub position: Msf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Audio,
    Mode1_2352,
}

impl TrackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Audio => "AUDIO",
            TrackType::Mode1_2352 => "MODE1/2352",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Binary,
    Motorola,
    Wave,
    Mp3,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Binary => "BINARY",
            FileType::Motorola => "MOTOROLA",
            FileType::Wave => "WAVE",
            FileType::Mp3 => "MP3",
        }
    }
}
