//! wordbench — benchmark serial, parallel CPU and GPU token counting.

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};

use wordbench::bench::{self, BenchConfig, RunRecord};
use wordbench::count::{Algorithm, ParallelCounter, Target};
use wordbench::gpu::{DeviceKind, GpuCounter, LaunchConfig, MatchMode};
use wordbench::record::ResultsWriter;
use wordbench::report::{self, Style};
use wordbench::samples;

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "wordbench",
    about = "Count a token in text corpora with serial, parallel CPU and GPU strategies",
    version
)]
struct Cli {
    /// Corpus files, relative to the samples directory (default: every
    /// `*.txt` file in it).
    files: Vec<PathBuf>,

    /// Directory holding the corpus files.
    #[arg(long, env = "WORDBENCH_SAMPLES_DIR", default_value = "samples")]
    samples_dir: PathBuf,

    /// CSV file the results are written to.
    #[arg(long, env = "WORDBENCH_RESULTS", default_value = "results/results.csv")]
    results: PathBuf,

    /// Token to count (case-insensitive).
    #[arg(short = 't', long, default_value = "the")]
    token: String,

    /// Repetitions of each strategy per file.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    runs: u32,

    /// Strategy to run (repeatable).  Available: serial, parallel, gpu.
    #[arg(short = 's', long = "strategy", value_name = "STRATEGY")]
    strategies: Vec<Algorithm>,

    /// Worker threads for the parallel CPU strategy (default: one per core).
    #[arg(long, value_name = "N")]
    workers: Option<NonZeroUsize>,

    /// Seconds to wait for parallel workers before giving up.
    #[arg(long, value_name = "SECS", default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Compute device for the GPU strategy: opencl or host.
    #[arg(long, default_value_t = DeviceKind::OpenCl)]
    device: DeviceKind,

    /// GPU match mode: substring or whole-word.
    #[arg(long = "match", value_name = "MODE", default_value_t = MatchMode::Substring)]
    match_mode: MatchMode,

    /// Global work size for the GPU kernel.
    #[arg(long, value_name = "N", default_value_t = 1024)]
    global_size: usize,

    /// Local work size for the GPU kernel; must divide the global size.
    #[arg(long, value_name = "N", default_value_t = 64)]
    local_size: usize,

    /// Disable ANSI colors.
    #[arg(long)]
    no_color: bool,

    /// Skip the summary tree at the end.
    #[arg(long)]
    no_summary: bool,
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Render a diagnostic to stderr without taking ownership of it.
fn print_diagnostic(diag: &dyn Diagnostic, style: Style) {
    let theme = if style.color {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    let mut rendered = String::new();
    if GraphicalReportHandler::new_themed(theme)
        .render_report(&mut rendered, diag)
        .is_ok()
    {
        eprint!("{rendered}");
    } else {
        eprintln!("error: {diag}");
    }
}

fn exit_with(diag: &dyn Diagnostic, style: Style, code: exitcode::ExitCode) -> ! {
    print_diagnostic(diag, style);
    std::process::exit(code);
}

fn corpus_files(cli: &Cli, style: Style) -> Vec<PathBuf> {
    if !cli.files.is_empty() {
        return samples::resolve(&cli.samples_dir, &cli.files);
    }
    let set = samples::discover(&cli.samples_dir);
    if let Some(diag) = samples::SampleErrors::from_set(&set) {
        print_diagnostic(&diag, style);
    }
    set.files
}

fn strategies(requested: &[Algorithm]) -> Vec<Algorithm> {
    if requested.is_empty() {
        return Algorithm::ALL.to_vec();
    }
    let mut algorithms = requested.to_vec();
    algorithms.sort_unstable();
    algorithms.dedup();
    algorithms
}

/// Progress line for `record`, preceded by a file header when the file changes.
fn announce(
    out: &mut dyn Write,
    current_file: &mut Option<String>,
    record: &RunRecord,
    target: &Target,
    style: Style,
) -> std::io::Result<()> {
    if current_file.as_deref() != Some(record.file.as_str()) {
        report::write_file_header(out, &record.file, target, style)?;
        *current_file = Some(record.file.clone());
    }
    report::write_progress(out, record, style)?;
    out.flush()
}

fn write_footer(
    out: &mut dyn Write,
    label: &str,
    summary: Option<&[report::FileSummary]>,
    style: Style,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Results saved to {label}")?;
    if let Some(summary) = summary {
        writeln!(out)?;
        report::write_summary(out, label, summary, style)?;
    }
    Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let style = Style::new(cli.no_color);

    let target = match Target::new(&cli.token) {
        Ok(t) => t,
        Err(e) => exit_with(&e, style, exitcode::USAGE),
    };
    let launch = match LaunchConfig::new(cli.global_size, cli.local_size) {
        Ok(l) => l,
        Err(e) => exit_with(&e, style, exitcode::USAGE),
    };

    let files = corpus_files(&cli, style);
    if files.is_empty() {
        eprintln!(
            "error: no corpus files found in {} (run `cargo xtask fetch-samples` to download some)",
            cli.samples_dir.display()
        );
        std::process::exit(exitcode::NOINPUT);
    }

    let mut parallel =
        ParallelCounter::new().with_timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(workers) = cli.workers {
        parallel = parallel.with_workers(workers);
    }
    let gpu = GpuCounter::new(cli.device)
        .with_mode(cli.match_mode)
        .with_launch(launch);

    let config = BenchConfig {
        files,
        target,
        runs: usize::try_from(cli.runs).unwrap_or(usize::MAX),
        algorithms: strategies(&cli.strategies),
        parallel,
        gpu,
    };

    if config.algorithms.contains(&Algorithm::ParallelGpu) && gpu.mode() == MatchMode::Substring {
        eprintln!(
            "note: {} counts substring matches; pass `--match whole-word` to count whole tokens only",
            Algorithm::ParallelGpu
        );
    }

    let mut sink = match ResultsWriter::create(&cli.results) {
        Ok(s) => s,
        Err(e) => exit_with(&e, style, exitcode::IOERR),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut current_file: Option<String> = None;
    let mut output_error: Option<std::io::Error> = None;

    let on_run = |record: &RunRecord| {
        if output_error.is_some() {
            return;
        }
        if let Err(e) = announce(&mut out, &mut current_file, record, &config.target, style) {
            output_error = Some(e);
            return;
        }
        if let Err(e) = &record.outcome {
            print_diagnostic(e, style);
        }
    };

    let records = match bench::run_benchmark(&config, &mut sink, on_run) {
        Ok(r) => r,
        Err(e) => exit_with(&e, style, exitcode::IOERR),
    };
    if let Some(e) = output_error {
        eprintln!("error writing output: {e}");
        std::process::exit(exitcode::IOERR);
    }
    if let Err(e) = sink.flush() {
        exit_with(&e, style, exitcode::IOERR);
    }

    let label = cli.results.display().to_string();
    let summary = report::summarize(&records);
    let shown = (!cli.no_summary).then_some(summary.as_slice());
    if let Err(e) = write_footer(&mut out, &label, shown, style) {
        eprintln!("error writing output: {e}");
        std::process::exit(exitcode::IOERR);
    }

    if report::failure_count(&summary) > 0 {
        std::process::exit(exitcode::UNAVAILABLE);
    }
}
