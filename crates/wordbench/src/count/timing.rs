use std::time::{Duration, Instant};

use super::CountError;

/// Match count and wall-clock cost of one counting invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountResult {
    /// Number of matches found.
    pub count: u64,
    /// Elapsed wall-clock time in whole milliseconds.
    pub elapsed_ms: u64,
}

/// Monotonic wall-clock timer.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Start timing now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time since [`Stopwatch::start`].
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time truncated to whole milliseconds, saturating at `u64::MAX`.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Run `work` and package its count with the elapsed time.
///
/// Everything `work` does is timed, including file I/O.
pub fn timed<F>(work: F) -> Result<CountResult, CountError>
where
    F: FnOnce() -> Result<u64, CountError>,
{
    let watch = Stopwatch::start();
    let count = work()?;
    Ok(CountResult {
        count,
        elapsed_ms: watch.elapsed_ms(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_passes_count_through() {
        let result = timed(|| Ok(42)).unwrap();
        assert_eq!(result.count, 42);
    }

    #[test]
    fn timed_covers_the_work() {
        let result = timed(|| {
            std::thread::sleep(Duration::from_millis(25));
            Ok(0)
        })
        .unwrap();
        assert!(result.elapsed_ms >= 25, "got {} ms", result.elapsed_ms);
    }

    #[test]
    fn timed_propagates_errors() {
        let err = timed(|| Err(CountError::InvalidTarget(String::new()))).unwrap_err();
        assert!(matches!(err, CountError::InvalidTarget(_)));
    }

    /// Successive readings from one stopwatch never go backwards.
    #[test]
    fn stopwatch_is_monotonic() {
        let watch = Stopwatch::start();
        let mut last = watch.elapsed();
        for _ in 0..1000 {
            let now = watch.elapsed();
            assert!(now >= last);
            last = now;
        }
    }
}
