//! CSV results file.
//!
//! One header row, then one row per successful run:
//!
//! ```text
//! Algorithm,File,Token,Count,ElapsedMs
//! SerialCPU,Dracula-165307.txt,the,7997,41
//! ```

use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::count::{Algorithm, CountResult};

/// Column names, in order.
pub const HEADER: [&str; 5] = ["Algorithm", "File", "Token", "Count", "ElapsedMs"];

/// Error type for writing the results file.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RecordError {
    /// The results file or its directory could not be created.
    #[error("cannot create results file {}", path.display())]
    #[diagnostic(code(wordbench::record::create))]
    Create {
        /// Requested results path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A row could not be written.
    #[error("failed to write results")]
    #[diagnostic(code(wordbench::record::write))]
    Write(#[from] csv::Error),

    /// Buffered rows could not be flushed.
    #[error("failed to flush results")]
    #[diagnostic(code(wordbench::record::flush))]
    Flush(#[from] std::io::Error),
}

/// One row of the results file.
#[derive(Debug, Serialize)]
pub struct ResultRow<'a> {
    /// Strategy display name.
    #[serde(serialize_with = "as_display")]
    pub algorithm: Algorithm,
    /// Corpus file name.
    pub file: &'a str,
    /// Target token as given.
    pub token: &'a str,
    /// Matches found.
    pub count: u64,
    /// Elapsed wall-clock milliseconds.
    pub elapsed_ms: u64,
}

impl<'a> ResultRow<'a> {
    /// Row for one run's result.
    #[must_use]
    pub fn new(algorithm: Algorithm, file: &'a str, token: &'a str, result: CountResult) -> Self {
        Self {
            algorithm,
            file,
            token,
            count: result.count,
            elapsed_ms: result.elapsed_ms,
        }
    }
}

fn as_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Sink for result rows.
pub struct ResultsWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl ResultsWriter<File> {
    /// Create (or truncate) the results file at `path`, creating missing
    /// parent directories, and write the header.
    pub fn create(path: &Path) -> Result<Self, RecordError> {
        let create_err = |source| RecordError::Create {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(create_err)?;
        }
        let file = File::create(path).map_err(create_err)?;
        Self::new(file)
    }
}

impl<W: Write> ResultsWriter<W> {
    /// Wrap `writer` and write the header.
    pub fn new(writer: W) -> Result<Self, RecordError> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        inner.write_record(HEADER)?;
        Ok(Self { inner })
    }

    /// Append one row.
    pub fn write(&mut self, row: &ResultRow<'_>) -> Result<(), RecordError> {
        self.inner.serialize(row)?;
        Ok(())
    }

    /// Flush buffered rows to the underlying writer.
    pub fn flush(&mut self) -> Result<(), RecordError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, RecordError> {
        self.inner
            .into_inner()
            .map_err(|e| RecordError::Flush(std::io::Error::other(e.to_string())))
    }
}
