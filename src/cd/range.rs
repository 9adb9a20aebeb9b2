use std::fmt;
use std::ops::RangeInclusive;

/// Inclusive span of track numbers, ripped in one drive reader pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackRange {
    pub start: u8,
    pub end: u8,
}

impl TrackRange {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn single(track_no: u8) -> Self {
        Self::new(track_no, track_no)
    }

    pub fn tracks(&self) -> RangeInclusive<u8> {
        self.start..=self.end
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }
}

/// `a-b`, or just `a` for a single track.
impl fmt::Display for TrackRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Groups track numbers into maximal runs of consecutive numbers.
///
/// `numbers` must be strictly increasing (and so duplicate-free); every
/// caller builds it from an ordered map's keys.
pub fn consecutive_ranges(numbers: impl IntoIterator<Item = u8>) -> Vec<TrackRange> {
    let mut ranges: Vec<TrackRange> = Vec::new();
    for number in numbers {
        match ranges.last_mut() {
            Some(last) if last.end.checked_add(1) == Some(number) => last.end = number,
            _ => ranges.push(TrackRange::single(number)),
        }
    }
    ranges
}
