use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hunter_core::{ExportKind, LeadFilters, SortField};

use super::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(name = "hunter")]
#[command(about = "Terminal dashboard for the lead-scoring backend")]
#[command(version)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "HUNTER_API_BASE_URL")]
    pub api_url: Option<String>,

    /// Config file (defaults to ./hunter.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, global = true, value_enum, default_value = "file")]
    pub log: LogDestination,

    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List leads with optional filters, paging and sorting
    Leads(LeadsArgs),
    /// Show dashboard statistics
    Dashboard,
    /// Upload a CSV/Excel file of domains and follow the batch job
    Upload {
        /// File to upload
        file: Option<PathBuf>,
        /// Let the backend detect which column holds the domain
        #[arg(long)]
        auto_detect: bool,
    },
    /// Follow an already running batch job
    Job { job_id: String },
    /// Scan a single domain and show its score breakdown
    Scan {
        domain: String,
        #[arg(long)]
        company: Option<String>,
    },
    /// Download the filtered lead list
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormatArg,
        #[command(flatten)]
        filters: FilterArgs,
        /// Start from the last saved filters
        #[arg(long)]
        saved: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub segment: Option<String>,
    /// Minimum readiness score (0-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_score: Option<u32>,
    #[arg(long)]
    pub provider: Option<String>,
    /// Free-text search on domain and company
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.segment.is_none()
            && self.min_score.is_none()
            && self.provider.is_none()
            && self.search.is_none()
    }

    /// Flags replace the matching fields of `base`.
    pub fn merge_into(&self, base: LeadFilters) -> LeadFilters {
        LeadFilters {
            segment: self.segment.clone().or(base.segment),
            min_score: self.min_score.or(base.min_score),
            provider: self.provider.clone().or(base.provider),
            search: self.search.clone().or(base.search),
        }
        .normalized()
    }
}

#[derive(Args, Debug)]
pub struct LeadsArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Start from the last saved filters
    #[arg(long)]
    pub saved: bool,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=200))]
    pub page_size: Option<u32>,
    /// domain, readiness_score, priority_score, segment, provider or scanned_at
    #[arg(long, value_parser = parse_sort_field)]
    pub sort: Option<SortField>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Xlsx,
}

impl From<ExportFormatArg> for ExportKind {
    fn from(value: ExportFormatArg) -> Self {
        match value {
            ExportFormatArg::Csv => ExportKind::Csv,
            ExportFormatArg::Xlsx => ExportKind::Excel,
        }
    }
}

fn parse_sort_field(name: &str) -> Result<SortField, String> {
    SortField::from_name(name).ok_or_else(|| {
        let names: Vec<&str> = SortField::ALL.iter().map(|field| field.as_str()).collect();
        format!("unknown sort field {name:?}; expected one of {}", names.join(", "))
    })
}
