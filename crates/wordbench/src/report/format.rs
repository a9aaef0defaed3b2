//! Pure formatting helpers for counts, timings and summary rows.

use owo_colors::OwoColorize;

use super::AlgorithmStats;
use crate::count::Algorithm;

/// Width of the algorithm name column.
const NAME_WIDTH: usize = 11;

/// Format a number with thousands separators (commas).
#[must_use]
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (len - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Count column: a single value, or `lo – hi` if runs disagreed.
pub(super) fn format_count(stats: &AlgorithmStats) -> Option<String> {
    let lo = stats.counts.iter().min()?;
    let hi = stats.counts.iter().max()?;
    Some(if lo == hi {
        format_number(*lo)
    } else {
        format!("{} \u{2013} {}", format_number(*lo), format_number(*hi))
    })
}

/// Timing column: `mean N ms (min A, max B)`.
pub(super) fn format_timing(stats: &AlgorithmStats) -> Option<String> {
    let min = stats.elapsed_ms.iter().min()?;
    let max = stats.elapsed_ms.iter().max()?;
    let sum: u64 = stats.elapsed_ms.iter().sum();
    let mean = sum / stats.elapsed_ms.len() as u64;
    Some(format!(
        "mean {} ms (min {}, max {})",
        format_number(mean),
        format_number(*min),
        format_number(*max)
    ))
}

/// One summary leaf: name, count, timing and any failures.
pub(super) fn format_stats_row(algorithm: Algorithm, stats: &AlgorithmStats, color: bool) -> String {
    let name = format!("{algorithm:<NAME_WIDTH$}");
    let name = if color {
        name.bold().to_string()
    } else {
        name
    };

    let mut row = match (format_count(stats), format_timing(stats)) {
        (Some(count), Some(timing)) => format!("{name}  {count:>9}  {timing}"),
        _ => name,
    };
    if stats.failures > 0 {
        let total = stats.failures + stats.counts.len();
        let note = format!("[{} of {total} failed]", stats.failures);
        row.push_str("  ");
        row.push_str(&if color {
            note.red().to_string()
        } else {
            note
        });
    }
    row
}

pub(super) fn dim(s: &str, color: bool) -> String {
    if color {
        s.dimmed().to_string()
    } else {
        s.to_string()
    }
}
