use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::persist::{AtomicFileWriter, OutputKind};
use crate::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn as_param(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "leads.csv",
            ExportFormat::Xlsx => "leads.xlsx",
        }
    }
}

/// Export body as generated by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Write(String),
}

/// Extracts `filename` from a `Content-Disposition` header value.
///
/// Only the final path component is kept.
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    let start = header.find("filename=")? + "filename=".len();
    let rest = header[start..].trim_start();
    let raw = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next()?,
        None => rest.split(';').next()?.trim(),
    };
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

/// Writes the payload into `dir` atomically and returns the final path.
pub fn save_export(dir: &Path, payload: &ExportPayload) -> Result<PathBuf, ExportError> {
    AtomicFileWriter::new(dir.to_path_buf(), OutputKind::LeadExport)
        .write(&payload.file_name, &payload.bytes)
        .map_err(|err| ExportError::Write(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_quoted_and_bare_names() {
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="leads_2025-01-02.csv""#)
                .as_deref(),
            Some("leads_2025-01-02.csv")
        );
        assert_eq!(
            file_name_from_disposition("attachment; filename=leads.xlsx; size=10").as_deref(),
            Some("leads.xlsx")
        );
        assert_eq!(file_name_from_disposition("inline"), None);
    }

    #[test]
    fn disposition_strips_directories() {
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(file_name_from_disposition(r#"attachment; filename="..""#), None);
    }
}
