use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use hunter_logging::hunter_debug;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::export::{file_name_from_disposition, ExportFormat, ExportPayload};
use crate::submit::{BatchOptions, CsvUpload};
use crate::{
    ApiError, BatchOutcome, DashboardStats, JobId, JobProgress, Lead, LeadPage, SalesSummary,
    ScanResult, ScoreBreakdown,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Uploads and exports move whole files and get a longer budget.
    pub transfer_timeout: Duration,
    pub max_export_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(300),
            max_export_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Single-attempt source of job progress; retries belong to the caller.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    async fn job_progress(&self, job_id: &JobId) -> Result<JobProgress, ApiError>;
}

/// HTTP client for the lead-scoring backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
    settings: ClientSettings,
}

impl BackendClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = Url::parse(settings.base_url.trim()).map_err(|err| {
            ApiError::Validation(format!("invalid API base url {:?}: {err}", settings.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Validation(format!(
                "API base url {:?} cannot carry paths",
                settings.base_url
            )));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base,
            settings,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}/{segments...}`; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation("API base url cannot carry paths".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn endpoint_with_query(
        &self,
        segments: &[&str],
        params: &[(String, String)],
    ) -> Result<Url, ApiError> {
        let mut url = self.endpoint(segments)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    pub async fn fetch_leads(&self, params: &[(String, String)]) -> Result<LeadPage, ApiError> {
        let url = self.endpoint_with_query(&["leads"], params)?;
        let response = send(self.http.get(url)).await?;
        let value: Value = read_json(response).await?;
        Ok(decode_lead_page(value))
    }

    pub async fn fetch_dashboard(&self) -> Result<DashboardStats, ApiError> {
        let url = self.endpoint(&["dashboard"])?;
        read_json(send(self.http.get(url)).await?).await
    }

    /// Registers a domain; the backend must know it before a scan.
    pub async fn ingest_domain(
        &self,
        domain: &str,
        company_name: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["ingest", "domain"])?;
        let mut body = json!({ "domain": domain });
        if let Some(name) = company_name {
            body["company_name"] = Value::from(name);
        }
        send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    pub async fn scan_domain(&self, domain: &str) -> Result<ScanResult, ApiError> {
        let url = self.endpoint(&["scan", "domain"])?;
        let response = send(self.http.post(url).json(&json!({ "domain": domain }))).await?;
        read_json(response).await
    }

    pub async fn score_breakdown(&self, domain: &str) -> Result<ScoreBreakdown, ApiError> {
        let url = self.endpoint(&["leads", domain, "score-breakdown"])?;
        read_json(send(self.http.get(url)).await?).await
    }

    /// Coaching content for a scanned lead; 404 until the lead has a score.
    pub async fn sales_summary(&self, domain: &str) -> Result<SalesSummary, ApiError> {
        let url = self.endpoint(&["leads", domain, "sales-summary"])?;
        read_json(send(self.http.get(url)).await?).await
    }

    pub async fn submit_batch(
        &self,
        upload: &CsvUpload,
        options: BatchOptions,
    ) -> Result<BatchOutcome, ApiError> {
        let params: Vec<(String, String)> = options
            .query_pairs()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let url = self.endpoint_with_query(&["ingest", "csv"], &params)?;
        let part = Part::bytes(upload.bytes().to_vec())
            .file_name(upload.file_name().to_string())
            .mime_str(upload.mime())
            .map_err(|err| ApiError::Validation(err.to_string()))?;
        let form = Form::new().part("file", part);

        hunter_debug!(
            "Submitting batch file={} bytes={} url={}",
            upload.file_name(),
            upload.len(),
            url
        );
        let request = self
            .http
            .post(url)
            .timeout(self.settings.transfer_timeout)
            .multipart(form);
        let value: Value = read_json(send(request).await?).await?;
        BatchOutcome::from_response(&value)
    }

    pub async fn export_leads(
        &self,
        params: &[(String, String)],
        format: ExportFormat,
    ) -> Result<ExportPayload, ApiError> {
        let mut params = params.to_vec();
        params.push(("format".to_string(), format.as_param().to_string()));
        let url = self.endpoint_with_query(&["leads", "export"], &params)?;
        let response = send(
            self.http
                .get(url)
                .timeout(self.settings.transfer_timeout),
        )
        .await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(file_name_from_disposition)
            .unwrap_or_else(|| format.default_file_name().to_string());

        let max_bytes = self.settings.max_export_bytes;
        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if buffer.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ApiError::Decode(format!(
                    "export exceeds {max_bytes} bytes"
                )));
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(ExportPayload {
            file_name,
            bytes: buffer.freeze(),
        })
    }
}

#[async_trait::async_trait]
impl JobSource for BackendClient {
    async fn job_progress(&self, job_id: &JobId) -> Result<JobProgress, ApiError> {
        if job_id.is_empty() {
            return Err(ApiError::Validation("no job id to poll".to_string()));
        }
        let url = self.endpoint(&["jobs", job_id.as_str()])?;
        let mut progress: JobProgress = read_json(send(self.http.get(url)).await?).await?;
        if progress.job_id.is_empty() {
            progress.job_id = job_id.clone();
        }
        Ok(progress)
    }
}

/// Sends the request; non-2xx becomes `ApiError::Http` with the decoded detail.
async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ApiError::Http {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body: Bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Transport(format!("request timed out: {err}"));
    }
    ApiError::Transport(err.to_string())
}

/// Pulls a display message out of a JSON error body.
///
/// Looks at `detail`, `message` and `error` in that order; FastAPI
/// validation lists contribute their `msg` entries.
pub(crate) fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| detail_text(value.get(key)?))
}

fn detail_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str).or(item.as_str()))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

/// Accepts the paginated shape, a bare array, or anything else as empty.
fn decode_lead_page(value: Value) -> LeadPage {
    match value {
        Value::Array(items) => {
            let leads = decode_leads(items);
            let count = leads.len();
            LeadPage {
                leads,
                total: count as u64,
                page: 1,
                page_size: count as u32,
                total_pages: 1,
            }
        }
        Value::Object(mut map) => match map.remove("leads") {
            Some(Value::Array(items)) => {
                let number = |key: &str| map.get(key).and_then(Value::as_u64).filter(|n| *n > 0);
                LeadPage {
                    leads: decode_leads(items),
                    total: map.get("total").and_then(Value::as_u64).unwrap_or(0),
                    page: number("page").unwrap_or(1) as u32,
                    page_size: number("page_size").unwrap_or(u64::from(DEFAULT_PAGE_SIZE)) as u32,
                    total_pages: number("total_pages").unwrap_or(1) as u32,
                }
            }
            _ => empty_page(),
        },
        _ => empty_page(),
    }
}

fn empty_page() -> LeadPage {
    LeadPage {
        leads: Vec::new(),
        total: 0,
        page: 1,
        page_size: DEFAULT_PAGE_SIZE,
        total_pages: 0,
    }
}

fn decode_leads(items: Vec<Value>) -> Vec<Lead> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}
