use std::fs;
use std::path::Path;

use bytes::Bytes;
use serde_json::Value;

use crate::{ApiError, BatchOutcome, JobId};

/// File chosen for batch ingestion, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    file_name: String,
    bytes: Bytes,
}

impl CsvUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads the file; a missing or unreadable file is a validation error.
    pub fn from_path(path: &Path) -> Result<Self, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::Validation("please select a file".to_string()))?
            .to_string();
        let bytes = fs::read(path).map_err(|err| {
            ApiError::Validation(format!("cannot read {}: {err}", path.display()))
        })?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime(&self) -> &'static str {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("xls") => "application/vnd.ms-excel",
            Some("csv") => "text/csv",
            _ => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    /// Let the backend guess which column holds the domain.
    pub auto_detect_columns: bool,
}

impl BatchOptions {
    /// Ingested rows are always scanned so they become leads.
    pub fn query_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::with_capacity(2);
        if self.auto_detect_columns {
            pairs.push(("auto_detect_columns", "true"));
        }
        pairs.push(("auto_scan", "true"));
        pairs
    }
}

impl BatchOutcome {
    /// A non-empty string or non-zero number `job_id` selects the async path;
    /// a missing, null, empty or zero one the legacy synchronous result.
    ///
    /// `true`, an array or an object would be truthy to the browser client but cannot name a job to poll, so they are a decode error rather
    /// than a silent fallback to the sync result.
    pub fn from_response(value: &Value) -> Result<Self, ApiError> {
        let Some(body) = value.as_object() else {
            return Err(ApiError::Decode(format!(
                "expected an object from batch submission, got {value}"
            )));
        };

        let job_id = match body.get("job_id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(n)) if n.as_f64().is_some_and(|n| n != 0.0) => Some(n.to_string()),
            Some(unusable @ (Value::Bool(true) | Value::Array(_) | Value::Object(_))) => {
                return Err(ApiError::Decode(format!(
                    "job_id {unusable} does not identify a job"
                )));
            }
            _ => None,
        };
        if let Some(id) = job_id {
            return Ok(BatchOutcome::Async {
                job_id: JobId::new(id),
            });
        }

        let count = |key: &str| body.get(key).and_then(Value::as_u64).unwrap_or(0);
        Ok(BatchOutcome::Sync {
            ingested: count("ingested"),
            scanned: count("scanned"),
        })
    }
}
