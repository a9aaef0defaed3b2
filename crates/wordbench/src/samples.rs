//! Locating the corpus files to benchmark.

use std::path::{Path, PathBuf};

/// Extension of files picked up by [`discover`].
const SAMPLE_EXTENSION: &str = "txt";

/// Corpus files found beneath one samples directory.
pub struct SampleSet {
    /// The directory that was searched.
    pub root: PathBuf,
    /// Matching files, sorted by path.
    pub files: Vec<PathBuf>,
    /// Entries that could not be visited.  These don't prevent the rest of
    /// the directory from being searched.
    pub errors: Vec<SampleError>,
}

impl SampleSet {
    /// Returns `true` if the search encountered any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A bundle of non-fatal discovery errors, rendered as related diagnostics.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("errors while searching {}", root.display())]
#[diagnostic(code(wordbench::samples))]
pub struct SampleErrors {
    root: PathBuf,
    #[related]
    related: Vec<SampleError>,
}

impl SampleErrors {
    /// Build a diagnostic from a [`SampleSet`]'s errors, or `None` if there
    /// are none.
    #[must_use]
    pub fn from_set(set: &SampleSet) -> Option<Self> {
        if set.errors.is_empty() {
            return None;
        }
        Some(Self {
            root: set.root.clone(),
            related: set
                .errors
                .iter()
                .map(|e| SampleError {
                    message: e.message.clone(),
                })
                .collect(),
        })
    }
}

/// A directory entry that could not be visited.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{message}")]
#[diagnostic(code(wordbench::samples::entry))]
pub struct SampleError {
    message: String,
}

/// Find every `*.txt` file beneath `root`.
///
/// Ignore files are not honoured: downloaded corpora are commonly
/// git-ignored.  Hidden entries are skipped.
#[must_use]
pub fn discover(root: &Path) -> SampleSet {
    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false);

    let mut files = Vec::new();
    let mut errors = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) && is_sample(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => errors.push(SampleError {
                message: e.to_string(),
            }),
        }
    }

    files.sort();
    SampleSet {
        root: root.to_path_buf(),
        files,
        errors,
    }
}

/// Resolve explicitly named files against `root`.  Absolute paths are kept
/// as given.
#[must_use]
pub fn resolve(root: &Path, names: &[PathBuf]) -> Vec<PathBuf> {
    names.iter().map(|name| root.join(name)).collect()
}

/// Label used for a corpus file in progress output and the results file.
#[must_use]
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

fn is_sample(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SAMPLE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"the").unwrap();
    }

    #[test]
    fn discover_finds_txt_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Moby.txt");
        touch(dir.path(), "Dracula.TXT");
        touch(dir.path(), "notes.md");
        touch(dir.path(), "nested/Quixote.txt");

        let set = discover(dir.path());
        let names: Vec<String> = set.files.iter().map(|p| file_label(p)).collect();

        assert_eq!(names, vec!["Dracula.TXT", "Moby.txt", "Quixote.txt"]);
        assert!(!set.has_errors());
    }

    #[test]
    fn discover_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".draft.txt");
        touch(dir.path(), "real.txt");

        let set = discover(dir.path());
        assert_eq!(set.files.len(), 1);
    }

    /// Corpora are found even when a `.gitignore` excludes them.
    #[test]
    fn discover_ignores_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.txt\n").unwrap();
        touch(dir.path(), "corpus.txt");

        assert_eq!(discover(dir.path()).files.len(), 1);
    }

    #[test]
    fn discover_collects_missing_root_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let set = discover(&dir.path().join("absent"));
        assert!(set.files.is_empty());
        assert!(set.has_errors());
        assert!(SampleErrors::from_set(&set).is_some());
    }

    #[rstest]
    #[case("Dracula-165307.txt", "samples/Dracula-165307.txt")]
    #[case("sub/a.txt", "samples/sub/a.txt")]
    fn resolve_joins_relative_names(#[case] name: &str, #[case] expected: &str) {
        let got = resolve(Path::new("samples"), &[PathBuf::from(name)]);
        assert_eq!(got, vec![PathBuf::from(expected)]);
    }

    #[test]
    fn resolve_keeps_absolute_names() {
        let abs = std::env::temp_dir().join("x.txt");
        assert_eq!(resolve(Path::new("samples"), &[abs.clone()]), vec![abs]);
    }
}
