//! Download speed measured by a bounded probe

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::config::{PROBE_BYTES, SPEED_PROBE_TIMEOUT_MS};
use crate::fetch::{FetchError, FetchSession, Probe};

/// Bytes per nanosecond; infinite when the probe took no measurable time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speed(f64);

impl Speed {
    pub fn from_probe(probe: &Probe) -> Self {
        let nanos = probe.elapsed.as_nanos();
        if nanos == 0 {
            Speed(f64::INFINITY)
        } else {
            Speed(probe.bytes as f64 / nanos as f64)
        }
    }

    pub fn bytes_per_nanosecond(&self) -> f64 {
        self.0
    }

    /// Total order, fastest last
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_infinite() {
            f.write_str("unmeasurable")
        } else {
            // bytes/ns * 1e9 / 1e6
            write!(f, "{:.2} MB/s", self.0 * 1000.0)
        }
    }
}

/// Stream the first [`PROBE_BYTES`] of `url` and time it
pub async fn measure_speed(
    session: &FetchSession,
    url: &str,
    headers: &[(String, String)],
) -> Result<Speed, FetchError> {
    let probe = session
        .probe(url, headers, PROBE_BYTES, Duration::from_millis(SPEED_PROBE_TIMEOUT_MS))
        .await?;
    Ok(Speed::from_probe(&probe))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(bytes: u64, elapsed: Duration) -> Probe {
        Probe { bytes, elapsed }
    }

    #[test]
    fn speed_is_bytes_per_nanosecond() {
        let speed = Speed::from_probe(&probe(2048, Duration::from_nanos(1024)));

        assert_eq!(speed.bytes_per_nanosecond(), 2.0);
    }

    #[test]
    fn zero_elapsed_is_infinitely_fast() {
        let instant = Speed::from_probe(&probe(2048, Duration::ZERO));
        let fast = Speed::from_probe(&probe(2048, Duration::from_nanos(1)));

        assert!(instant.bytes_per_nanosecond().is_infinite());
        assert_eq!(instant.total_cmp(&fast), Ordering::Greater);
        assert_eq!(instant.to_string(), "unmeasurable");
    }

    #[test]
    fn display_in_megabytes_per_second() {
        let speed = Speed::from_probe(&probe(2_000_000, Duration::from_secs(1)));

        assert_eq!(speed.to_string(), "2.00 MB/s");
    }
}
