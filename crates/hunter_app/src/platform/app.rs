use std::collections::VecDeque;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use hunter_core::{
    update, AppState, LeadFilters, LeadQuery, Msg, Severity, Sort, SortOrder,
};
use hunter_logging::{hunter_debug, hunter_info, parse_level};

use super::cli::{Cli, Command, LeadsArgs};
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::logging;
use super::persistence;
use super::ui::render::{self, Renderer};

const EVENT_WAIT: Duration = Duration::from_millis(100);
/// Shell convention for termination by SIGINT.
const INTERRUPTED_EXIT: u8 = 130;

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::initialize(cli.log, parse_level(&cli.log_level));

    let working_dir = std::env::current_dir().context("cannot determine working directory")?;
    let mut config = AppConfig::load(cli.config.as_deref(), &working_dir)?;
    config.apply_overrides(cli.api_url.as_deref());
    config.validate()?;
    hunter_info!("Using backend {}", config.api_base_url);

    let plan = plan(cli.command, &working_dir);
    let runner =
        EffectRunner::new(&config, working_dir).context("cannot start the backend client")?;
    runner.forward_interrupts();
    let mut session = Session {
        state: AppState::with_query(plan.query),
        runner,
        renderer: Renderer::new(),
    };
    for stage in plan.stages {
        session.run_until_settled(stage)?;
        if session.state.is_interrupted() {
            break;
        }
    }

    let view = session.state.view();
    for line in render::summary(&view, plan.show_leads) {
        println!("{line}");
    }
    let failed = view
        .notices
        .iter()
        .any(|notice| notice.severity == Severity::Error);
    Ok(if failed {
        ExitCode::FAILURE
    } else if session.state.is_interrupted() {
        ExitCode::from(INTERRUPTED_EXIT)
    } else {
        ExitCode::SUCCESS
    })
}

/// Initial query plus message batches; each batch runs once the previous one
/// has settled.
struct Plan {
    query: LeadQuery,
    stages: Vec<Vec<Msg>>,
    show_leads: bool,
}

fn plan(command: Command, working_dir: &Path) -> Plan {
    let single = |msg: Msg, show_leads: bool| Plan {
        query: LeadQuery::default(),
        stages: vec![vec![msg]],
        show_leads,
    };
    match command {
        Command::Leads(args) => leads_plan(args, working_dir),
        Command::Dashboard => single(Msg::RefreshRequested, false),
        Command::Upload { file, auto_detect } => single(
            Msg::CsvSubmitted {
                path: file.map(|path| path.display().to_string()),
                auto_detect,
            },
            true,
        ),
        Command::Job { job_id } => single(Msg::TrackJob { job_id }, true),
        Command::Scan { domain, company } => single(
            Msg::ScanSubmitted {
                domain,
                company_name: company,
            },
            false,
        ),
        Command::Export {
            format,
            filters,
            saved,
        } => Plan {
            query: LeadQuery {
                filters: filters.merge_into(saved_or_default(saved, working_dir)),
                ..LeadQuery::default()
            },
            stages: vec![vec![Msg::ExportRequested(format.into())]],
            show_leads: false,
        },
    }
}

fn leads_plan(args: LeadsArgs, working_dir: &Path) -> Plan {
    let base = saved_or_default(args.saved, working_dir);
    let mut query = LeadQuery {
        sort: args.sort.map(|field| Sort {
            field,
            order: if args.desc {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            },
        }),
        ..LeadQuery::default()
    };
    if let Some(page_size) = args.page_size {
        query.page_size = page_size;
    }

    let first = if args.filters.is_empty() {
        query.filters = base;
        Msg::RefreshRequested
    } else {
        Msg::FiltersApplied(args.filters.merge_into(base))
    };
    let mut stages = vec![vec![first]];
    // Page numbers clamp against the page count of the first load.
    if args.page > 1 {
        stages.push(vec![Msg::PageRequested(args.page)]);
    }
    Plan {
        query,
        stages,
        show_leads: true,
    }
}

fn saved_or_default(saved: bool, working_dir: &Path) -> LeadFilters {
    if saved {
        persistence::load_filters(working_dir)
    } else {
        LeadFilters::default()
    }
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl Session {
    /// Fails when the monitor thread died with work still pending.
    fn run_until_settled(&mut self, stage: Vec<Msg>) -> anyhow::Result<()> {
        let mut inbox: VecDeque<Msg> = stage.into();
        loop {
            while let Some(msg) = inbox.pop_front() {
                let follow_ups = self.dispatch(msg);
                inbox.extend(follow_ups);
            }
            if self.state.is_settled() || self.state.is_interrupted() {
                return Ok(());
            }
            let next = self
                .runner
                .next_msg(EVENT_WAIT)
                .context("no further backend events can arrive")?;
            inbox.extend(next);
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Msg> {
        hunter_debug!("Dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            for line in self.renderer.frame(&state.view()) {
                println!("{line}");
            }
        }
        self.state = state;
        self.runner.enqueue(effects)
    }
}
