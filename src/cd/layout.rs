use crate::cd::Msf;
use std::ops::RangeInclusive;

/// One entry of the disc's table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub begin: Msf,
    /// Unknown when the layout came from a cue sheet.
    pub length: Option<Msf>,
    pub copy_permitted: bool,
    pub pre_emphasis: bool,
    pub audio_channels: u8,
}

impl Track {
    pub fn new(begin: Msf, length: Option<Msf>) -> Self {
        Self {
            begin,
            length,
            copy_permitted: false,
            pre_emphasis: false,
            audio_channels: 2,
        }
    }
}

/// Ordered, one-indexed list of tracks. Built once per session and
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscLayout {
    tracks: Vec<Track>,
    leadout: Option<Msf>,
}

impl DiscLayout {
    pub fn new(tracks: Vec<Track>, leadout: Option<Msf>) -> Self {
        let leadout = leadout.or_else(|| {
            tracks
                .last()
                .and_then(|last| last.length.map(|length| last.begin + length))
        });
        Self { tracks, leadout }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn leadout(&self) -> Option<Msf> {
        self.leadout
    }

    /// All track numbers, `1..=N`.
    pub fn track_numbers(&self) -> RangeInclusive<u8> {
        1..=self.tracks.len() as u8
    }

    pub fn track(&self, track_no: u8) -> Option<&Track> {
        let idx = usize::from(track_no).checked_sub(1)?;
        self.tracks.get(idx)
    }

    /// `begin + length` when the length is known, otherwise the next track's
    /// begin, otherwise the leadout.
    pub fn track_end(&self, track_no: u8) -> Option<Msf> {
        let track = self.track(track_no)?;
        if let Some(length) = track.length {
            return Some(track.begin + length);
        }
        match self.track(track_no.checked_add(1)?) {
            Some(next) => Some(next.begin),
            None => self.leadout,
        }
    }

    pub fn track_length(&self, track_no: u8) -> Option<Msf> {
        let track = self.track(track_no)?;
        track
            .length
            .or_else(|| self.track_end(track_no)?.checked_sub(track.begin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msf(frames: u32) -> Msf {
        Msf::from_frames(frames)
    }

    #[test]
    fn end_uses_length_when_known() {
        let layout = DiscLayout::new(
            vec![
                Track::new(msf(0), Some(msf(16503))),
                Track::new(msf(16503), Some(msf(20492))),
            ],
            None,
        );
        assert_eq!(layout.track_end(1), Some(msf(16503)));
        assert_eq!(layout.track_end(2), Some(msf(36995)));
        assert_eq!(layout.leadout(), Some(msf(36995)));
    }

    #[test]
    fn end_falls_back_to_next_begin_then_leadout() {
        let layout = DiscLayout::new(
            vec![Track::new(msf(0), None), Track::new(msf(16503), None)],
            Some(msf(36995)),
        );
        assert_eq!(layout.track_end(1), Some(msf(16503)));
        assert_eq!(layout.track_end(2), Some(msf(36995)));
        assert_eq!(layout.track_length(2), Some(msf(20492)));
    }

    #[test]
    fn unknown_leadout_leaves_last_end_unknown() {
        let layout = DiscLayout::new(vec![Track::new(msf(0), None)], None);
        assert_eq!(layout.track_end(1), None);
        assert_eq!(layout.track_length(1), None);
    }

    #[test]
    fn tracks_are_one_indexed() {
        let layout = DiscLayout::new(
            vec![Track::new(msf(0), None), Track::new(msf(10), None)],
            None,
        );
        assert!(layout.track(0).is_none());
        assert_eq!(layout.track(2).unwrap().begin, msf(10));
        assert!(layout.track(3).is_none());
        assert_eq!(layout.track_numbers(), 1..=2);
    }
}
