//! Console output: per-run progress lines and the end-of-session summary.

mod format;

pub use format::format_number;

use std::collections::BTreeMap;
use std::io::Write;

use owo_colors::OwoColorize;
use termtree::Tree;

use crate::bench::RunRecord;
use crate::count::{Algorithm, Target};

/// Rendering configuration derived from CLI flags.
#[derive(Clone, Copy, Debug)]
pub struct Style {
    /// When `true`, emit ANSI color codes.
    pub color: bool,
}

impl Style {
    /// Colour only when stdout is a terminal and neither `--no-color` nor
    /// `NO_COLOR` asks otherwise.
    #[must_use]
    pub fn new(no_color: bool) -> Self {
        let color = !no_color && std::env::var("NO_COLOR").is_err() && {
            use std::io::IsTerminal;
            std::io::stdout().is_terminal()
        };
        Self { color }
    }

    /// Never colour.
    #[must_use]
    pub fn plain() -> Self {
        Self { color: false }
    }
}

/// Announce the start of a file's runs.
pub fn write_file_header(
    out: &mut dyn Write,
    file: &str,
    target: &Target,
    style: Style,
) -> std::io::Result<()> {
    let file = if style.color {
        file.bold().to_string()
    } else {
        file.to_string()
    };
    writeln!(out)?;
    writeln!(out, "Analyzing {file} for token {target:?}", target = target.as_str())
}

/// One line per completed run.
pub fn write_progress(
    out: &mut dyn Write,
    record: &RunRecord,
    style: Style,
) -> std::io::Result<()> {
    let label = format!("{} ({})", record.algorithm, record.run);
    match &record.outcome {
        Ok(result) => writeln!(
            out,
            "{label}: {} occurrences in {} ms",
            format_number(result.count),
            format_number(result.elapsed_ms)
        ),
        Err(e) => {
            let failed = if style.color {
                "failed".red().to_string()
            } else {
                "failed".to_string()
            };
            writeln!(out, "{label}: {failed}: {e}")
        }
    }
}

/// Aggregated runs of one strategy on one file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlgorithmStats {
    /// Counts of the successful runs.
    pub counts: Vec<u64>,
    /// Elapsed milliseconds of the successful runs.
    pub elapsed_ms: Vec<u64>,
    /// Number of failed runs.
    pub failures: usize,
}

/// Aggregated runs for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    /// Corpus file label.
    pub file: String,
    /// Per-strategy results, in strategy order.
    pub algorithms: BTreeMap<Algorithm, AlgorithmStats>,
}

/// Group run records by file (first-seen order) and strategy.
#[must_use]
pub fn summarize(records: &[RunRecord]) -> Vec<FileSummary> {
    let mut files: Vec<FileSummary> = Vec::new();
    for record in records {
        let idx = match files.iter().position(|f| f.file == record.file) {
            Some(i) => i,
            None => {
                files.push(FileSummary {
                    file: record.file.clone(),
                    algorithms: BTreeMap::new(),
                });
                files.len() - 1
            }
        };
        let stats = files[idx].algorithms.entry(record.algorithm).or_default();
        match &record.outcome {
            Ok(result) => {
                stats.counts.push(result.count);
                stats.elapsed_ms.push(result.elapsed_ms);
            }
            Err(_) => stats.failures += 1,
        }
    }
    files
}

/// Total failed runs across a summary.
#[must_use]
pub fn failure_count(summary: &[FileSummary]) -> usize {
    summary
        .iter()
        .flat_map(|f| f.algorithms.values())
        .map(|s| s.failures)
        .sum()
}

/// Render the summary as a tree rooted at `root_label`.
pub fn write_summary(
    out: &mut dyn Write,
    root_label: &str,
    summary: &[FileSummary],
    style: Style,
) -> std::io::Result<()> {
    let mut root = Tree::new(format::dim(root_label, style.color));
    for file in summary {
        let leaves = file
            .algorithms
            .iter()
            .map(|(alg, stats)| Tree::new(format::format_stats_row(*alg, stats, style.color)));
        root.push(Tree::new(file.file.clone()).with_leaves(leaves));
    }
    write!(out, "{root}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::{CountError, CountResult};

    fn ok(file: &str, algorithm: Algorithm, run: usize, count: u64, ms: u64) -> RunRecord {
        RunRecord {
            file: file.to_string(),
            algorithm,
            run,
            outcome: Ok(CountResult {
                count,
                elapsed_ms: ms,
            }),
        }
    }

    fn failed(file: &str, algorithm: Algorithm, run: usize) -> RunRecord {
        RunRecord {
            file: file.to_string(),
            algorithm,
            run,
            outcome: Err(CountError::Device(crate::gpu::DeviceError::NoDevice)),
        }
    }

    fn render(records: &[RunRecord]) -> String {
        let mut out = Vec::new();
        write_summary(&mut out, "results.csv", &summarize(records), Style::plain()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn progress_line_for_success() {
        let mut out = Vec::new();
        let record = ok("a.txt", Algorithm::SerialCpu, 2, 12_345, 41);
        write_progress(&mut out, &record, Style::plain()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "SerialCPU (2): 12,345 occurrences in 41 ms\n"
        );
    }

    #[test]
    fn progress_line_for_failure() {
        let mut out = Vec::new();
        write_progress(&mut out, &failed("a.txt", Algorithm::ParallelGpu, 1), Style::plain())
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ParallelGPU (1): failed: no compute device found\n"
        );
    }

    #[test]
    fn file_header_names_file_and_token() {
        let mut out = Vec::new();
        let target = Target::new("the").unwrap();
        write_file_header(&mut out, "Dracula.txt", &target, Style::plain()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\nAnalyzing Dracula.txt for token \"the\"\n"
        );
    }

    #[test]
    fn summarize_groups_by_file_then_algorithm() {
        let records = vec![
            ok("b.txt", Algorithm::SerialCpu, 1, 3, 10),
            ok("b.txt", Algorithm::SerialCpu, 2, 3, 12),
            failed("b.txt", Algorithm::ParallelGpu, 1),
            ok("a.txt", Algorithm::ParallelCpu, 1, 5, 1),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].file, "b.txt");
        assert_eq!(summary[1].file, "a.txt");
        let serial = &summary[0].algorithms[&Algorithm::SerialCpu];
        assert_eq!(serial.counts, vec![3, 3]);
        assert_eq!(serial.elapsed_ms, vec![10, 12]);
        assert_eq!(summary[0].algorithms[&Algorithm::ParallelGpu].failures, 1);
        assert_eq!(failure_count(&summary), 1);
    }

    #[test]
    fn summary_renders_as_tree() {
        let records = vec![
            ok("a.txt", Algorithm::SerialCpu, 1, 3, 10),
            ok("a.txt", Algorithm::SerialCpu, 2, 3, 12),
            failed("a.txt", Algorithm::ParallelGpu, 1),
            ok("b.txt", Algorithm::ParallelCpu, 1, 1_000, 4),
        ];
        assert_eq!(
            render(&records),
            "results.csv\n\
             ├── a.txt\n\
             │   ├── SerialCPU            3  mean 11 ms (min 10, max 12)\n\
             │   └── ParallelGPU  [1 of 1 failed]\n\
             └── b.txt\n\
             \x20   └── ParallelCPU      1,000  mean 4 ms (min 4, max 4)\n"
        );
    }
}
