//! Counting strategies and their shared result and error types.

mod error;
pub mod parallel;
pub mod serial;
mod target;
mod timing;

use std::path::Path;

pub use error::CountError;
pub use parallel::{ParallelCounter, count_partitioned, partition};
pub use serial::{SerialCounter, count_serial};
pub use target::{Target, eq_ignore_case};
pub use timing::{CountResult, Stopwatch, timed};

pub use algorithm::Algorithm;

/// Common interface for every counting strategy.
///
/// Each call reads the file, tokenizes, counts and tears down whatever it
/// acquired before returning.  Nothing is shared between calls.
pub trait Counter {
    /// Which strategy this is.
    fn algorithm(&self) -> Algorithm;
    /// Count occurrences of `target` in the file at `path`.
    fn count(&self, path: &Path, target: &Target) -> Result<CountResult, CountError>;
}

mod algorithm {
    use std::fmt;

    /// Stable identifier for each counting strategy.
    ///
    /// Declaration order is the order the driver runs them in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum Algorithm {
        /// Single-threaded scan (`"serial"`).
        SerialCpu,
        /// Partitioned multi-threaded scan (`"parallel"`).
        ParallelCpu,
        /// Data-parallel kernel on a compute device (`"gpu"`).
        ParallelGpu,
    }

    impl Algorithm {
        /// Every strategy, in run order.
        pub const ALL: [Self; 3] = [Self::SerialCpu, Self::ParallelCpu, Self::ParallelGpu];

        /// Short CLI key used in `-s` flags.
        #[must_use]
        pub fn as_str(self) -> &'static str {
            match self {
                Self::SerialCpu => "serial",
                Self::ParallelCpu => "parallel",
                Self::ParallelGpu => "gpu",
            }
        }
    }

    /// Name written to the `Algorithm` column of the results file.
    impl fmt::Display for Algorithm {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = match self {
                Self::SerialCpu => "SerialCPU",
                Self::ParallelCpu => "ParallelCPU",
                Self::ParallelGpu => "ParallelGPU",
            };
            f.pad(s)
        }
    }

    impl std::str::FromStr for Algorithm {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "serial" => Ok(Self::SerialCpu),
                "parallel" => Ok(Self::ParallelCpu),
                "gpu" => Ok(Self::ParallelGpu),
                other => Err(format!(
                    "unknown strategy {other:?} (expected serial, parallel or gpu)"
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Algorithm::SerialCpu, "serial", "SerialCPU")]
    #[case(Algorithm::ParallelCpu, "parallel", "ParallelCPU")]
    #[case(Algorithm::ParallelGpu, "gpu", "ParallelGPU")]
    fn algorithm_names(#[case] alg: Algorithm, #[case] key: &str, #[case] display: &str) {
        assert_eq!(alg.as_str(), key);
        assert_eq!(alg.to_string(), display);
        assert_eq!(key.parse::<Algorithm>().unwrap(), alg);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        assert!("cuda".parse::<Algorithm>().is_err());
    }

    #[test]
    fn display_respects_width() {
        assert_eq!(format!("{:<12}|", Algorithm::SerialCpu), "SerialCPU   |");
    }
}
