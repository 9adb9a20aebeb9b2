//! Audio CD positions are addressed as "minute:second:frame", where a
//! frame is one sector and there are 75 frames in a second.
//!
//! `Msf` stores the plain frame count so arithmetic stays trivial; the
//! `mm:ss:ff` form only exists at the text boundary.

use crate::cd::error::{CdError, CdResult};
use crate::cd::{FRAMES_PER_SECOND, SECTOR_SIZE};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

lazy_static! {
    // Minutes are usually two digits, longer discs round-trip with more.
    static ref MSF_RE: Regex = Regex::new(r"^(\d{2,}):(\d\d):(\d\d)$").unwrap();
    static ref FRAMES_RE: Regex = Regex::new(r"^\d+$").unwrap();
}

/// A position or duration on the disc, counted in frames (sectors).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msf(u32);

impl Msf {
    pub const ZERO: Msf = Msf(0);

    pub const fn from_frames(frames: u32) -> Self {
        Msf(frames)
    }

    pub const fn frames(self) -> u32 {
        self.0
    }

    /// `(minutes, seconds, frames)` components.
    pub const fn triplet(self) -> (u32, u32, u32) {
        (
            self.0 / FRAMES_PER_SECOND / 60,
            (self.0 / FRAMES_PER_SECOND) % 60,
            self.0 % FRAMES_PER_SECOND,
        )
    }

    pub fn seconds(self) -> f64 {
        self.0 as f64 / FRAMES_PER_SECOND as f64
    }

    /// Byte offset of this position in a raw 2352-byte/sector image.
    pub const fn bytes(self) -> u64 {
        self.0 as u64 * SECTOR_SIZE as u64
    }

    pub fn checked_sub(self, rhs: Msf) -> Option<Msf> {
        self.0.checked_sub(rhs.0).map(Msf)
    }
}

impl From<u32> for Msf {
    fn from(frames: u32) -> Self {
        Msf(frames)
    }
}

impl From<Msf> for u32 {
    fn from(msf: Msf) -> Self {
        msf.0
    }
}

impl FromStr for Msf {
    type Err = CdError;

    fn from_str(s: &str) -> CdResult<Self> {
        let invalid = || CdError::InvalidFormat(s.to_string());

        if let Some(caps) = MSF_RE.captures(s) {
            let mm: u32 = caps[1].parse().map_err(|_| invalid())?;
            let ss: u32 = caps[2].parse().map_err(|_| invalid())?;
            let ff: u32 = caps[3].parse().map_err(|_| invalid())?;
            if ss >= 60 || ff >= FRAMES_PER_SECOND {
                return Err(invalid());
            }
            let frames = mm
                .checked_mul(60)
                .and_then(|s| s.checked_add(ss))
                .and_then(|s| s.checked_mul(FRAMES_PER_SECOND))
                .and_then(|f| f.checked_add(ff))
                .ok_or_else(invalid)?;
            return Ok(Msf(frames));
        }

        if FRAMES_RE.is_match(s) {
            return s.parse().map(Msf).map_err(|_| invalid());
        }

        Err(invalid())
    }
}

impl fmt::Display for Msf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m, s, fr) = self.triplet();
        write!(f, "{m:02}:{s:02}:{fr:02}")
    }
}

impl Add for Msf {
    type Output = Msf;

    fn add(self, rhs: Msf) -> Msf {
        Msf(self.0 + rhs.0)
    }
}

impl Add<u32> for Msf {
    type Output = Msf;

    fn add(self, rhs: u32) -> Msf {
        Msf(self.0 + rhs)
    }
}

/// Panics if `rhs` is past `self`; use [`Msf::checked_sub`] when that can
/// happen.
impl Sub for Msf {
    type Output = Msf;

    fn sub(self, rhs: Msf) -> Msf {
        match self.checked_sub(rhs) {
            Some(msf) => msf,
            None => panic!("overflow when subtracting {rhs} from {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_msf_and_bare_frames() {
        assert_eq!("00:00:00".parse::<Msf>().unwrap(), Msf::ZERO);
        assert_eq!("03:40:03".parse::<Msf>().unwrap().frames(), 16503);
        assert_eq!("16503".parse::<Msf>().unwrap().frames(), 16503);
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in ["", "3:40:03", "03:40", "03:40.03", "03:60:00", "00:00:75", "abc", "-1"] {
            assert!(
                matches!(bad.parse::<Msf>(), Err(CdError::InvalidFormat(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips() {
        for frames in [0, 1, 74, 75, 4499, 4500, 16503, 329_039, 449_999, 450_000, 1_000_000] {
            let msf = Msf::from_frames(frames);
            assert_eq!(msf.to_string().parse::<Msf>().unwrap(), msf);
        }
        assert_eq!(Msf::from_frames(329_039).to_string(), "73:07:14");
    }

    #[test]
    fn bytes_are_frames_times_sector_size() {
        assert_eq!(Msf::from_frames(0).bytes(), 0);
        assert_eq!(Msf::from_frames(16503).bytes(), 16503 * 2352);
        assert_eq!(Msf::from_frames(u32::MAX).bytes(), u32::MAX as u64 * 2352);
    }

    #[test]
    fn arithmetic() {
        let a = Msf::from_frames(16503);
        let b = Msf::from_frames(20492);
        assert_eq!((a + b).frames(), 36995);
        assert_eq!((a + 1).frames(), 16504);
        assert_eq!(b - a, Msf::from_frames(3989));
        assert_eq!(a.checked_sub(b), None);
    }

    #[test]
    #[should_panic]
    fn subtracting_past_zero_panics() {
        let _ = Msf::from_frames(1) - Msf::from_frames(2);
    }
}
