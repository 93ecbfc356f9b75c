use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// What a writer stores; errors name it so the operator knows which file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    LeadExport,
    SavedFilters,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputKind::LeadExport => "lead export",
            OutputKind::SavedFilters => "saved filters",
        })
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot use {} for the {kind}: {reason}", dir.display())]
    OutputDir {
        kind: OutputKind,
        dir: PathBuf,
        reason: String,
    },
    #[error("{name:?} is not a plain file name for the {kind}")]
    FileName { kind: OutputKind, name: String },
    #[error("failed to write the {kind} to {}: {source}", path.display())]
    Write {
        kind: OutputKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Creates `dir` when missing; an existing non-directory is an error.
pub fn ensure_output_dir(dir: &Path, kind: OutputKind) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir {
        kind,
        dir: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(unusable("not a directory".to_string())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|err| unusable(err.to_string()))
        }
        Err(err) => Err(unusable(err.to_string())),
    }
}

/// Writes `{dir}/{filename}` through a temp file and a rename, so readers
/// never see a half-written export or state file.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
    kind: OutputKind,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf, kind: OutputKind) -> Self {
        Self { dir, kind }
    }

    /// `filename` must be a bare name; server-supplied export names end up here.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename == ".."
        {
            return Err(PersistError::FileName {
                kind: self.kind,
                name: filename.to_string(),
            });
        }
        ensure_output_dir(&self.dir, self.kind)?;

        let target = self.dir.join(filename);
        let failed = |source: io::Error| PersistError::Write {
            kind: self.kind,
            path: target.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(failed)?;
        tmp.write_all(content).map_err(failed)?;
        tmp.as_file_mut().sync_all().map_err(failed)?;
        tmp.persist(&target).map_err(|err| failed(err.error))?;
        Ok(target)
    }
}
