use hunter_core::{
    AppViewModel, DashboardStats, JobPhase, JobSnapshot, LeadPage, LeadQuery, SalesBrief,
    ScanState, SortField, SortOrder, UploadState,
};

use super::constants::{BAR_WIDTH, COLUMNS};

/// Prints only what changed between frames: new notices and a progress line
/// when it differs from the last one shown.
#[derive(Debug, Default)]
pub struct Renderer {
    notices_seen: usize,
    last_progress: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(progress) = progress_line(&view.upload) {
            if self.last_progress.as_ref() != Some(&progress) {
                lines.push(progress.clone());
                self.last_progress = Some(progress);
            }
        }
        lines.extend(
            view.notices
                .iter()
                .skip(self.notices_seen)
                .map(ToString::to_string),
        );
        self.notices_seen = view.notices.len();
        lines
    }
}

/// Final screen once everything has settled.
pub fn summary(view: &AppViewModel, show_leads: bool) -> Vec<String> {
    let mut lines = scan_lines(&view.scan);
    if let Some(stats) = &view.dashboard {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(dashboard_lines(stats));
    }
    if show_leads {
        if let Some(page) = &view.page {
            lines.push(String::new());
            lines.extend(leads_table(page, &view.query));
        }
    }
    lines
}

pub fn progress_line(upload: &UploadState) -> Option<String> {
    match upload {
        UploadState::Submitting { file_name } => Some(format!("Uploading {file_name}...")),
        UploadState::Tracking {
            job_id,
            snapshot,
            poll_error,
            ..
        } => {
            let mut line = match snapshot {
                Some(snapshot) => snapshot_line(snapshot),
                None => format!("Job {job_id}: waiting for the first progress report"),
            };
            if let Some(error) = poll_error {
                line.push_str(&format!(" (last poll failed: {error})"));
            }
            Some(line)
        }
        UploadState::Idle | UploadState::Done(_) => None,
    }
}

fn snapshot_line(snapshot: &JobSnapshot) -> String {
    let phase = match snapshot.phase {
        JobPhase::Pending => "pending",
        JobPhase::Running => "running",
        JobPhase::Completed => "completed",
        JobPhase::Failed => "failed",
    };
    format!(
        "Job {} {} {:>3.0}% {}/{} processed, {} ok, {} failed, {} remaining [{}]",
        snapshot.job_id,
        progress_bar(snapshot.percent),
        snapshot.percent.clamp(0.0, 100.0),
        snapshot.processed,
        snapshot.total,
        snapshot.successful,
        snapshot.failed,
        snapshot.remaining,
        phase
    )
}

pub fn progress_bar(percent: f64) -> String {
    let ratio = if percent.is_finite() {
        percent.clamp(0.0, 100.0) / 100.0
    } else {
        0.0
    };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn dashboard_lines(stats: &DashboardStats) -> Vec<String> {
    let max = stats
        .max_score
        .map(|score| score.to_string())
        .unwrap_or_else(|| "-".to_string());
    vec![
        format!(
            "Leads: {} total, {} high priority, avg score {:.1}, max {}",
            stats.total_leads, stats.high_priority, stats.avg_score, max
        ),
        format!(
            "Segments: migration {}, existing {}, cold {}, skip {}",
            stats.migration, stats.existing, stats.cold, stats.skip
        ),
    ]
}

pub fn scan_lines(scan: &ScanState) -> Vec<String> {
    let ScanState::Done {
        domain,
        summary,
        breakdown,
        sales,
        ..
    } = scan
    else {
        return Vec::new();
    };
    let Some(summary) = summary else {
        return Vec::new();
    };

    let mut lines = vec![format!(
        "{domain}: score {}, segment {}, provider {}",
        optional(summary.score),
        summary.segment.as_deref().unwrap_or("-"),
        summary.provider.as_deref().unwrap_or("-")
    )];
    if let Some(breakdown) = breakdown {
        lines.push(format!("  base score       {:>4}", breakdown.base_score));
        lines.push(format!(
            "  provider {:<8}{:>+4}",
            breakdown.provider.as_deref().unwrap_or("-"),
            breakdown.provider_points
        ));
        for (signal, points) in &breakdown.signal_points {
            lines.push(format!("  {signal:<16}{points:>+4}"));
        }
        for (risk, points) in &breakdown.risk_points {
            lines.push(format!("  {risk:<16}{points:>+4}"));
        }
        lines.push(format!("  total            {:>4}", breakdown.total_score));
    }
    if let Some(sales) = sales {
        lines.extend(sales_lines(sales));
    }
    lines
}

fn sales_lines(sales: &SalesBrief) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!("Sales: {}", sales.one_liner),
        format!(
            "  offer {} at {:.2} EUR/user/month, urgency {}, opportunity {}/100",
            sales.offer_tier, sales.price_per_user_per_month, sales.urgency, sales.opportunity_potential
        ),
    ];
    if !sales.offer_recommendation.is_empty() {
        lines.push(format!("  {}", sales.offer_recommendation));
    }
    for (title, items) in [
        ("Call script", &sales.call_script),
        ("Discovery questions", &sales.discovery_questions),
    ] {
        if items.is_empty() {
            continue;
        }
        lines.push(format!("  {title}:"));
        lines.extend(items.iter().map(|item| format!("    - {item}")));
    }
    lines
}

pub fn leads_table(page: &LeadPage, query: &LeadQuery) -> Vec<String> {
    if page.rows.is_empty() {
        return vec!["No leads match the current filters".to_string()];
    }

    let cells: Vec<[String; 6]> = page
        .rows
        .iter()
        .map(|row| {
            [
                row.domain.clone(),
                row.company.clone().unwrap_or_default(),
                optional(row.readiness_score),
                optional(row.priority_score),
                row.segment.clone().unwrap_or_default(),
                row.provider.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let headers: Vec<String> = COLUMNS
        .iter()
        .map(|(title, field)| header(title, *field, query))
        .collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = vec![join_row(&headers, &widths)];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(cells.iter().map(|row| join_row(row, &widths)));
    lines.push(format!(
        "Page {} of {} ({} leads)",
        page.page,
        page.total_pages.max(1),
        page.total
    ));
    lines
}

fn header(title: &str, field: Option<SortField>, query: &LeadQuery) -> String {
    match query.sort {
        Some(sort) if Some(sort.field) == field => {
            let arrow = match sort.order {
                SortOrder::Asc => '^',
                SortOrder::Desc => 'v',
            };
            format!("{title} {arrow}")
        }
        _ => title.to_string(),
    }
}

fn join_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunter_core::{BreakdownSummary, LeadRow, Notice, ScanSummary, Sort};
    use pretty_assertions::assert_eq;

    fn snapshot(processed: u64, phase: JobPhase) -> JobSnapshot {
        JobSnapshot {
            job_id: "job-42".to_string(),
            seq: processed,
            phase,
            processed,
            successful: processed,
            failed: 0,
            remaining: 10 - processed,
            total: 10,
            percent: processed as f64 * 10.0,
            message: None,
        }
    }

    fn tracking(snapshot: Option<JobSnapshot>, poll_error: Option<&str>) -> UploadState {
        UploadState::Tracking {
            job_id: "job-42".to_string(),
            last_seq: 0,
            snapshot,
            poll_error: poll_error.map(str::to_string),
        }
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0), format!("[{}]", ".".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(100.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(250.0), progress_bar(100.0));
        assert_eq!(progress_bar(f64::NAN), progress_bar(0.0));
        assert_eq!(progress_bar(50.0).matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn progress_line_shows_counts_and_poll_errors() {
        let line = progress_line(&tracking(Some(snapshot(5, JobPhase::Running)), None)).unwrap();
        assert!(line.starts_with("Job job-42 ["));
        assert!(line.contains(" 50% 5/10 processed, 5 ok, 0 failed, 5 remaining [running]"));

        let waiting = progress_line(&tracking(None, Some("Server error"))).unwrap();
        assert_eq!(
            waiting,
            "Job job-42: waiting for the first progress report (last poll failed: Server error)"
        );
        assert_eq!(progress_line(&UploadState::Idle), None);
    }

    #[test]
    fn frames_only_repeat_changed_lines() {
        let mut renderer = Renderer::new();
        let mut view = AppViewModel {
            upload: tracking(Some(snapshot(2, JobPhase::Running)), None),
            ..AppViewModel::default()
        };
        assert_eq!(renderer.frame(&view).len(), 1);
        assert!(renderer.frame(&view).is_empty());

        view.upload = UploadState::Done(Notice::success("Success! 10 domains scanned"));
        view.notices.push(Notice::success("Success! 10 domains scanned"));
        assert_eq!(
            renderer.frame(&view),
            vec!["[ok] Success! 10 domains scanned".to_string()]
        );
        assert!(renderer.frame(&view).is_empty());
    }

    #[test]
    fn table_marks_sorted_column_and_pads_cells() {
        let page = LeadPage {
            rows: vec![
                LeadRow {
                    domain: "acme.com".to_string(),
                    company: Some("Acme".to_string()),
                    readiness_score: Some(82),
                    priority_score: Some(7),
                    segment: Some("migration".to_string()),
                    provider: Some("google".to_string()),
                },
                LeadRow {
                    domain: "globex-international.io".to_string(),
                    ..LeadRow::default()
                },
            ],
            total: 52,
            page: 2,
            page_size: 50,
            total_pages: 2,
        };
        let query = LeadQuery {
            sort: Some(Sort {
                field: SortField::ReadinessScore,
                order: SortOrder::Desc,
            }),
            ..LeadQuery::default()
        };

        let lines = leads_table(&page, &query);
        assert!(lines[0].starts_with("Domain                   Company  Readiness v"));
        assert!(lines[2].starts_with("acme.com                 Acme     82"));
        assert!(lines[3].starts_with("globex-international.io  "));
        assert!(lines[3].contains(" - "));
        assert_eq!(lines.last().unwrap(), "Page 2 of 2 (52 leads)");
    }

    #[test]
    fn empty_page_has_a_message() {
        assert_eq!(
            leads_table(&LeadPage::default(), &LeadQuery::default()),
            vec!["No leads match the current filters".to_string()]
        );
    }

    #[test]
    fn scan_summary_lists_breakdown_points() {
        let scan = ScanState::Done {
            domain: "acme.com".to_string(),
            summary: Some(ScanSummary {
                domain: "acme.com".to_string(),
                score: Some(42),
                segment: Some("existing".to_string()),
                provider: Some("google".to_string()),
            }),
            breakdown: Some(BreakdownSummary {
                base_score: 10,
                total_score: 42,
                provider: Some("google".to_string()),
                provider_points: 20,
                signal_points: vec![("spf".to_string(), 5), ("dmarc".to_string(), 7)],
                risk_points: Vec::new(),
            }),
            sales: None,
            notice: Notice::success("Scan completed"),
        };

        let lines = scan_lines(&scan);
        assert_eq!(lines[0], "acme.com: score 42, segment existing, provider google");
        assert_eq!(lines[2], "  provider google   +20");
        assert_eq!(lines[3], "  spf               +5");
        assert_eq!(lines.last().unwrap(), "  total              42");
    }

    #[test]
    fn sales_summary_follows_the_breakdown() {
        let scan = ScanState::Done {
            domain: "acme.com".to_string(),
            summary: Some(ScanSummary {
                domain: "acme.com".to_string(),
                score: Some(80),
                ..ScanSummary::default()
            }),
            breakdown: None,
            sales: Some(SalesBrief {
                one_liner: "Google user ready for migration".to_string(),
                call_script: vec!["Mention the migration offer".to_string()],
                discovery_questions: Vec::new(),
                offer_tier: "Business Standard".to_string(),
                price_per_user_per_month: 10.4,
                offer_recommendation: String::new(),
                opportunity_potential: 78,
                urgency: "high".to_string(),
            }),
            notice: Notice::success("Scan completed"),
        };

        let lines = scan_lines(&scan);
        assert_eq!(
            lines[1..].to_vec(),
            vec![
                String::new(),
                "Sales: Google user ready for migration".to_string(),
                "  offer Business Standard at 10.40 EUR/user/month, urgency high, opportunity 78/100"
                    .to_string(),
                "  Call script:".to_string(),
                "    - Mention the migration offer".to_string(),
            ]
        );
    }
}
