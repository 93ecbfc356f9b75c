use std::fmt;

/// Lifecycle of a backend batch job as seen by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

/// One poll result, stamped with the session-local sequence number.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobSnapshot {
    pub job_id: String,
    pub seq: u64,
    pub phase: JobPhase,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub remaining: u64,
    pub total: u64,
    pub percent: f64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadRow {
    pub domain: String,
    pub company: Option<String>,
    pub readiness_score: Option<i64>,
    pub priority_score: Option<i64>,
    pub segment: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadPage {
    pub rows: Vec<LeadRow>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub total_leads: u64,
    pub migration: u64,
    pub existing: u64,
    pub cold: u64,
    pub skip: u64,
    pub avg_score: f64,
    pub max_score: Option<i64>,
    pub high_priority: u64,
}

/// Result of a synchronous domain scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub domain: String,
    pub score: Option<i64>,
    pub segment: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BreakdownSummary {
    pub base_score: i64,
    pub total_score: i64,
    pub provider: Option<String>,
    pub provider_points: i64,
    pub signal_points: Vec<(String, i64)>,
    pub risk_points: Vec<(String, i64)>,
}

/// Sales coaching content generated for a scanned lead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SalesBrief {
    pub one_liner: String,
    pub call_script: Vec<String>,
    pub discovery_questions: Vec<String>,
    pub offer_tier: String,
    pub price_per_user_per_month: f64,
    pub offer_recommendation: String,
    /// 0-100.
    pub opportunity_potential: i64,
    pub urgency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    /// Success that still needs operator attention.
    Caveat,
    Error,
}

/// Operator-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            text: text.into(),
        }
    }

    pub fn caveat(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Caveat,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Caveat => "note",
            Severity::Error => "error",
        };
        write!(f, "[{tag}] {}", self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportKind {
    #[default]
    Csv,
    Excel,
}

impl ExportKind {
    /// Value of the backend `format` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            ExportKind::Csv => "csv",
            ExportKind::Excel => "xlsx",
        }
    }
}
