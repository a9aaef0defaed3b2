//! Single-threaded counting.

use std::path::Path;

use super::timing::{CountResult, timed};
use super::{Algorithm, CountError, Counter, Target};
use crate::corpus::TokenSequence;

/// Count tokens equal to `target`, scanning once in index order.
#[must_use]
pub fn count_serial<'a>(tokens: impl IntoIterator<Item = &'a str>, target: &Target) -> u64 {
    let mut count = 0;
    for token in tokens {
        if target.matches(token) {
            count += 1;
        }
    }
    count
}

/// Single-threaded strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialCounter;

impl Counter for SerialCounter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::SerialCpu
    }

    fn count(&self, path: &Path, target: &Target) -> Result<CountResult, CountError> {
        timed(|| {
            let tokens = TokenSequence::load(path)?;
            Ok(count_serial(tokens.iter(), target))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("the cat sat on THE mat the end", 3)]
    #[case("", 0)]
    #[case("theme other bathe", 0)]
    #[case("The. the the,", 1)]
    #[case("the\nthe\tthe the", 4)]
    fn counts_whole_token_matches(#[case] text: &str, #[case] expected: u64) {
        let seq = TokenSequence::new(text);
        let target = Target::new("the").unwrap();
        assert_eq!(count_serial(seq.iter(), &target), expected);
    }

    #[test]
    fn counter_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.txt");
        std::fs::write(&path, "the cat sat on THE mat the end").unwrap();

        let result = SerialCounter
            .count(&path, &Target::new("the").unwrap())
            .unwrap();
        assert_eq!(result.count, 3);
    }

    #[test]
    fn counter_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SerialCounter
            .count(&dir.path().join("missing.txt"), &Target::new("the").unwrap())
            .unwrap_err();
        assert!(matches!(err, CountError::Io { .. }));
    }
}
