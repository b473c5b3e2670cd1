//! Report writer.
//!
//! Both report documents are rendered in memory from a frozen [`EvalRun`]
//! before anything touches the filesystem. Each file is then written to a
//! temp file in its destination directory and renamed into place, so a
//! reader never sees a half-written report.

pub mod json;
pub mod summary;
pub mod tabular;

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{EvalRun, ReportWriteError};
use crate::obs;

pub use json::{parse_json, render_json, SCHEMA_VERSION};
pub use summary::{ModelSummary, RunSummary, VerdictCounts};
pub use tabular::render_tsv;

/// Default output prefix.
pub const DEFAULT_PREFIX: &str = "eval_results";

/// Destination of the two report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub table: PathBuf,
}

impl ReportPaths {
    /// `<prefix>.json` and `<prefix>.tsv`.
    pub fn from_prefix(prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref().as_os_str();
        Self {
            json: with_suffix(prefix, ".json"),
            table: with_suffix(prefix, ".tsv"),
        }
    }
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self::from_prefix(DEFAULT_PREFIX)
    }
}

fn with_suffix(prefix: &std::ffi::OsStr, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix);
    name.push(suffix);
    PathBuf::from(name)
}

/// A report file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Render and write both reports for `run`.
pub fn write_reports(
    run: &EvalRun,
    paths: &ReportPaths,
) -> Result<Vec<WrittenReport>, ReportWriteError> {
    let json = render_json(run).map_err(|source| ReportWriteError::Serialize {
        path: paths.json.clone(),
        source,
    })?;
    let table = render_tsv(run);

    let run_id = run.run_id().to_string();
    let mut written = Vec::with_capacity(2);
    for (path, contents) in [(&paths.json, json), (&paths.table, table)] {
        write_atomic(path, contents.as_bytes())?;
        obs::emit_report_written(&run_id, path, contents.len());
        written.push(WrittenReport {
            path: path.clone(),
            bytes: contents.len(),
        });
    }
    Ok(written)
}

/// Write via a temp file in the destination directory, then rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReportWriteError> {
    let io_err = |source| ReportWriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
