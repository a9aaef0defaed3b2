//! Workspace development tasks.
//!
//! Run with `cargo xtask <subcommand>`.

use std::path::{Path, PathBuf};

/// Project Gutenberg plain-text editions used as benchmark corpora.
///
/// The number in each file name is the size of the text in words, for
/// telling the corpora apart at a glance in the results file.
const SAMPLES: [(&str, &str); 3] = [
    (
        "https://www.gutenberg.org/cache/epub/996/pg996.txt",
        "DonQuixote-388208.txt",
    ),
    (
        "https://www.gutenberg.org/cache/epub/345/pg345.txt",
        "Dracula-165307.txt",
    ),
    (
        "https://www.gutenberg.org/cache/epub/2701/pg2701.txt",
        "MobyDick-217452.txt",
    ),
];

fn main() {
    let mut args = std::env::args().skip(1);
    let subcommand = args.next();
    match subcommand.as_deref() {
        Some("fetch-samples") => {
            let dir = args
                .next()
                .map_or_else(|| workspace_root().join("samples"), PathBuf::from);
            if let Err(e) = fetch_samples(&dir) {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(other) => {
            eprintln!("error: unknown subcommand {other:?}");
            eprintln!("available: fetch-samples [DIR]");
            std::process::exit(1);
        }
        None => {
            eprintln!("usage: cargo xtask <subcommand>");
            eprintln!("available: fetch-samples [DIR]");
            std::process::exit(1);
        }
    }
}

/// Download every sample corpus into `dir`, skipping files already present.
fn fetch_samples(dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("cannot create {}: {e}", dir.display()))?;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("wordbench-xtask/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| format!("cannot build HTTP client: {e}"))?;

    for (url, name) in SAMPLES {
        let out_path = dir.join(name);
        if out_path.exists() {
            eprintln!("{} already present, skipping.", out_path.display());
            continue;
        }

        // ── download ─────────────────────────────────────────────────────────

        eprint!("Downloading {url} … ");
        let resp = client
            .get(url)
            .send()
            .map_err(|e| format!("HTTP request failed: {e}"))?;
        if !resp.status().is_success() {
            eprintln!();
            return Err(format!("HTTP {} for {url}", resp.status()));
        }
        let body = resp
            .bytes()
            .map_err(|e| format!("failed to read response body: {e}"))?;
        eprintln!("done.");

        // ── write ────────────────────────────────────────────────────────────

        std::fs::write(&out_path, &body)
            .map_err(|e| format!("cannot write {}: {e}", out_path.display()))?;
        eprintln!("Written {} bytes to {}", body.len(), out_path.display());
    }
    Ok(())
}

/// Resolve the workspace root as the parent of this package's manifest dir.
fn workspace_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent() // crates/
        .and_then(Path::parent) // workspace root
        .map_or_else(|| manifest.clone(), Path::to_path_buf)
}
