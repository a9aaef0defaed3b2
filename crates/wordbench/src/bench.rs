//! The benchmark driver: every file × every strategy × N runs.

use std::io::Write;
use std::path::PathBuf;

use crate::count::{
    Algorithm, CountError, CountResult, Counter, ParallelCounter, SerialCounter, Target,
};
use crate::gpu::GpuCounter;
use crate::record::{RecordError, ResultRow, ResultsWriter};
use crate::samples::file_label;

/// Everything one benchmark session needs.
#[derive(Debug)]
pub struct BenchConfig {
    /// Corpus files, in run order.
    pub files: Vec<PathBuf>,
    /// Token to count.
    pub target: Target,
    /// Repetitions of each strategy per file.
    pub runs: usize,
    /// Strategies to run, in order.
    pub algorithms: Vec<Algorithm>,
    /// Multi-threaded CPU strategy settings.
    pub parallel: ParallelCounter,
    /// Compute-device strategy settings.
    pub gpu: GpuCounter,
}

impl BenchConfig {
    fn counter(&self, algorithm: Algorithm) -> &dyn Counter {
        match algorithm {
            Algorithm::SerialCpu => &SerialCounter,
            Algorithm::ParallelCpu => &self.parallel,
            Algorithm::ParallelGpu => &self.gpu,
        }
    }
}

/// Outcome of one counting invocation.
#[derive(Debug)]
pub struct RunRecord {
    /// Corpus file label.
    pub file: String,
    /// Strategy that ran.
    pub algorithm: Algorithm,
    /// 1-based repetition number.
    pub run: usize,
    /// Count and timing, or why the run failed.
    pub outcome: Result<CountResult, CountError>,
}

/// Run every configured strategy against every file.
///
/// `on_run` sees each record as soon as it completes.  A failed run is
/// recorded and the session moves on; only a failure to write the results
/// file stops it.
pub fn run_benchmark<W, F>(
    config: &BenchConfig,
    sink: &mut ResultsWriter<W>,
    mut on_run: F,
) -> Result<Vec<RunRecord>, RecordError>
where
    W: Write,
    F: FnMut(&RunRecord),
{
    let mut records = Vec::with_capacity(config.files.len() * config.algorithms.len() * config.runs);

    for path in &config.files {
        let file = file_label(path);
        for &algorithm in &config.algorithms {
            let counter = config.counter(algorithm);
            for run in 1..=config.runs {
                let outcome = counter.count(path, &config.target);
                if let Ok(result) = &outcome {
                    sink.write(&ResultRow::new(
                        algorithm,
                        &file,
                        config.target.as_str(),
                        *result,
                    ))?;
                }
                let record = RunRecord {
                    file: file.clone(),
                    algorithm,
                    run,
                    outcome,
                };
                on_run(&record);
                records.push(record);
            }
        }
        sink.flush()?;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::gpu::{DeviceKind, MatchMode};
    use rstest::{fixture, rstest};

    struct Corpus {
        _dir: tempfile::TempDir,
        files: Vec<PathBuf>,
    }

    #[fixture]
    fn corpus() -> Corpus {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "the cat sat on THE mat the end").unwrap();
        std::fs::write(&b, "The other theme").unwrap();
        Corpus {
            _dir: dir,
            files: vec![a, b],
        }
    }

    fn config(files: Vec<PathBuf>, algorithms: Vec<Algorithm>, gpu: GpuCounter) -> BenchConfig {
        BenchConfig {
            files,
            target: Target::new("the").unwrap(),
            runs: 3,
            algorithms,
            parallel: ParallelCounter::new().with_workers(NonZeroUsize::new(4).unwrap()),
            gpu,
        }
    }

    fn run(config: &BenchConfig) -> (Vec<RunRecord>, String) {
        let mut sink = ResultsWriter::new(Vec::new()).unwrap();
        let records = run_benchmark(config, &mut sink, |_| {}).unwrap();
        let csv = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        (records, csv)
    }

    #[rstest]
    fn every_file_strategy_and_run_is_recorded(corpus: Corpus) {
        let cfg = config(
            corpus.files.clone(),
            Algorithm::ALL.to_vec(),
            GpuCounter::new(DeviceKind::Host),
        );
        let (records, csv) = run(&cfg);

        assert_eq!(records.len(), 2 * 3 * 3);
        assert_eq!(csv.lines().count(), 1 + 2 * 3 * 3);
        assert!(records.iter().all(|r| r.outcome.is_ok()));

        let first: Vec<_> = records.iter().take(3).map(|r| (r.algorithm, r.run)).collect();
        assert_eq!(
            first,
            vec![
                (Algorithm::SerialCpu, 1),
                (Algorithm::SerialCpu, 2),
                (Algorithm::SerialCpu, 3)
            ]
        );
    }

    /// Substring matching on the device counts "the" inside "other" and
    /// "theme"; the CPU strategies count whole tokens only.
    #[rstest]
    fn rows_carry_counts_per_strategy(corpus: Corpus) {
        let cfg = config(
            corpus.files.clone(),
            Algorithm::ALL.to_vec(),
            GpuCounter::new(DeviceKind::Host).with_mode(MatchMode::Substring),
        );
        let (_, csv) = run(&cfg);
        let rows: Vec<Vec<&str>> = csv.lines().skip(1).map(|l| l.split(',').collect()).collect();

        for row in &rows {
            let expected = match (row[0], row[1]) {
                (_, "a.txt") => "3",
                ("ParallelGPU", "b.txt") => "3",
                (_, "b.txt") => "1",
                other => panic!("unexpected row {other:?}"),
            };
            assert_eq!(row[3], expected, "{row:?}");
            assert_eq!(row[2], "the");
        }
    }

    /// A missing file fails its runs without stopping the others.
    #[rstest]
    fn failures_do_not_stop_the_session(corpus: Corpus) {
        let mut files = corpus.files.clone();
        files.insert(1, corpus.files[0].with_file_name("missing.txt"));
        let cfg = config(
            files,
            vec![Algorithm::SerialCpu, Algorithm::ParallelCpu],
            GpuCounter::default(),
        );
        let (records, csv) = run(&cfg);

        let failed: Vec<_> = records.iter().filter(|r| r.outcome.is_err()).collect();
        assert_eq!(failed.len(), 2 * 3);
        assert!(failed.iter().all(|r| r.file == "missing.txt"));
        assert!(failed
            .iter()
            .all(|r| matches!(r.outcome, Err(CountError::Io { .. }))));
        // Rows only for the two readable files.
        assert_eq!(csv.lines().count(), 1 + 2 * 2 * 3);
    }

    #[rstest]
    fn on_run_sees_every_record(corpus: Corpus) {
        let cfg = config(
            corpus.files.clone(),
            vec![Algorithm::SerialCpu],
            GpuCounter::default(),
        );
        let mut seen = Vec::new();
        let mut sink = ResultsWriter::new(Vec::new()).unwrap();
        run_benchmark(&cfg, &mut sink, |r| seen.push((r.file.clone(), r.run))).unwrap();
        assert_eq!(
            seen,
            vec![
                ("a.txt".to_string(), 1),
                ("a.txt".to_string(), 2),
                ("a.txt".to_string(), 3),
                ("b.txt".to_string(), 1),
                ("b.txt".to_string(), 2),
                ("b.txt".to_string(), 3),
            ]
        );
    }
}
