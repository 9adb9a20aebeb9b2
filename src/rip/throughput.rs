use crate::cd::SPEED_1X;
use std::ops::AddAssign;
use std::time::Duration;

/// Bytes moved over wall time; only ever reported, never used to decide.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn new(bytes: u64, elapsed: Duration) -> Self {
        Self { bytes, elapsed }
    }

    /// Multiple of the nominal 1x CD rate, `None` until time has passed.
    pub fn speed(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 && self.bytes > 0 {
            Some(self.bytes as f64 / secs / SPEED_1X as f64)
        } else {
            None
        }
    }
}

impl AddAssign for Throughput {
    fn add_assign(&mut self, rhs: Self) {
        self.bytes += rhs.bytes;
        self.elapsed += rhs.elapsed;
    }
}
