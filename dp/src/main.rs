//! dailyplan - bounded daily plans from your issue tracker
//!
//! CLI entry point.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tokio::sync::mpsc;
use tracing::{debug, info};

use dailyplan::approval::{ApprovalFlow, ApprovalOutcome, ConsoleIo};
use dailyplan::cli::{Cli, ClosureCommand, Command, OutputFormat, get_log_path};
use dailyplan::config::Config;
use dailyplan::domain::DailyPlan;
use dailyplan::events::{EventBus, EventLogger, EventType, create_event_bus};
use dailyplan::planner::{FileClosureLedger, PlanGenerator};
use dailyplan::report::{render_plan, render_subtasks};
use dailyplan::scheduler::{BackgroundScheduler, OperationReport};
use dailyplan::source::{FileIssueSource, IssueSource};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Everything a command needs, wired from the configuration
struct App {
    config: Config,
    bus: Arc<EventBus>,
    source: Arc<dyn IssueSource>,
    planner: Arc<PlanGenerator>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let bus = create_event_bus();
        if let Some(path) = &config.storage.event_log {
            let logger = Arc::new(EventLogger::open(path).context("Failed to open event log")?);
            logger.attach(
                &bus,
                &[EventType::PlanGenerated, EventType::TaskBlocked, EventType::ApprovalTimeout],
            );
            debug!(?path, "App::new: event log attached");
        }

        let source: Arc<dyn IssueSource> = Arc::new(FileIssueSource::new(&config.storage.issues_file));
        let ledger = Arc::new(FileClosureLedger::new(&config.storage.closure_dir));
        let planner = Arc::new(
            PlanGenerator::new(Arc::clone(&source), ledger, config.planner.clone()).with_event_bus(Arc::clone(&bus)),
        );

        Ok(Self {
            config,
            bus,
            source,
            planner,
        })
    }

    fn approval_flow(&self) -> ApprovalFlow {
        ApprovalFlow::new(self.config.approval.timeout()).with_event_bus(Arc::clone(&self.bus))
    }

    fn plan_path(&self, date: NaiveDate) -> PathBuf {
        self.config
            .storage
            .closure_dir
            .join(format!("plan-{}.json", date.format("%Y-%m-%d")))
    }

    fn save_plan(&self, plan: &DailyPlan) -> Result<()> {
        let path = self.plan_path(plan.date);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create plan directory")?;
        }
        fs::write(&path, serde_json::to_string_pretty(plan)?)
            .context(format!("Failed to write plan to {}", path.display()))?;
        debug!(?path, "App::save_plan: written");
        Ok(())
    }

    fn load_plan(&self, date: NaiveDate) -> Result<Option<DailyPlan>> {
        load_plan_file(&self.plan_path(date))
    }
}

fn load_plan_file(path: &Path) -> Result<Option<DailyPlan>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let plan = serde_json::from_str(&content).context(format!("Failed to parse {}", path.display()))?;
    Ok(Some(plan))
}

fn print_plan(plan: &DailyPlan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render_plan(plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(issues_file = %config.storage.issues_file.display(), "dailyplan loaded config");

    let app = App::new(config)?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Plan {
            closure_rate,
            format,
            review,
        } => cmd_plan(&app, closure_rate, format, review).await,
        Command::Replan { key, format } => cmd_replan(&app, &key, format).await,
        Command::Decompose { key, create } => cmd_decompose(&app, &key, create).await,
        Command::Closure { command } => match command {
            ClosureCommand::Save { date } => cmd_closure_save(&app, date).await,
            ClosureCommand::Show { date } => cmd_closure_show(&app, date),
        },
        Command::Watch { once } => cmd_watch(&app, once).await,
    }
}

async fn cmd_plan(app: &App, closure_rate: Option<f64>, format: OutputFormat, review: bool) -> Result<()> {
    if let Some(rate) = closure_rate
        && !(0.0..=1.0).contains(&rate)
    {
        return Err(eyre!("--closure-rate must be between 0.0 and 1.0, got {}", rate));
    }

    let mut plan = app.planner.generate_daily_plan(closure_rate).await?;

    if review {
        let mut io = ConsoleIo::new();
        match app.approval_flow().review_plan(&mut io, &plan).await? {
            ApprovalOutcome::Approved => println!("{}", "Plan approved".green().bold()),
            ApprovalOutcome::Modified { modifications } => {
                plan = plan.apply_modifications(&modifications)?;
                println!("{}", "Plan approved with modifications".green().bold());
            }
            ApprovalOutcome::Rejected { feedback } => {
                println!("{}", "Plan rejected".yellow().bold());
                if let Some(feedback) = feedback {
                    info!(%feedback, "Plan rejected with feedback");
                    println!("Feedback: {}", feedback);
                }
                return Ok(());
            }
        }
    }

    app.save_plan(&plan)?;
    print_plan(&plan, format)
}

async fn cmd_replan(app: &App, key: &str, format: OutputFormat) -> Result<()> {
    let issue = app
        .source
        .get_issue(key)
        .await?
        .ok_or_else(|| eyre!("Issue {} not found", key))?;

    let today = Local::now().date_naive();
    let current = match app.load_plan(today)? {
        Some(plan) => plan,
        None => app.planner.generate_daily_plan_for(today, None).await?,
    };

    let plan = app.planner.generate_replan(&issue, &current).await?;
    app.save_plan(&plan)?;
    print_plan(&plan, format)
}

async fn cmd_decompose(app: &App, key: &str, create: bool) -> Result<()> {
    let issue = app
        .source
        .get_issue(key)
        .await?
        .ok_or_else(|| eyre!("Issue {} not found", key))?;

    let subtasks = app.planner.propose_decomposition(&issue);
    if subtasks.is_empty() {
        println!("{} fits in a single day, nothing to decompose", issue.key);
        return Ok(());
    }

    if !create {
        println!("{}", render_subtasks(&issue, &subtasks));
        return Ok(());
    }

    let mut io = ConsoleIo::new();
    match app.approval_flow().review_decomposition(&mut io, &issue, &subtasks).await? {
        ApprovalOutcome::Approved => {
            let keys = app.planner.create_subtasks(&issue.key, &subtasks).await?;
            println!("{} {}", "Created".green().bold(), keys.join(", "));
        }
        _ => println!("{}", "Decomposition rejected, nothing created".yellow()),
    }
    Ok(())
}

async fn cmd_closure_save(app: &App, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let plan = app
        .load_plan(date)?
        .ok_or_else(|| eyre!("No saved plan for {}; run `dp plan` first", date))?;

    let record = app.planner.save_closure_record(date, &plan.priorities).await?;
    println!(
        "{}: closed {}/{} priorities ({:.0}%)",
        record.date,
        record.completed_priorities,
        record.total_priorities,
        record.closure_rate * 100.0
    );
    if !record.incomplete_tasks.is_empty() {
        println!("Incomplete: {}", record.incomplete_tasks.join(", "));
    }
    Ok(())
}

fn cmd_closure_show(app: &App, date: Option<NaiveDate>) -> Result<()> {
    let date = match date {
        Some(date) => date,
        None => Local::now()
            .date_naive()
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| eyre!("No previous day"))?,
    };

    match app.planner.load_closure_record(date)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No closure record for {}", date),
    }
    Ok(())
}

fn print_report(report: &OperationReport) {
    if report.is_completed() {
        let result = report.result.as_ref().map(|r| r.to_string()).unwrap_or_default();
        println!("{} {} {}", "✓".green(), report.operation_type, result);
    } else {
        let error = report.error.as_deref().unwrap_or("unknown error");
        println!("{} {} {}", "✗".red(), report.operation_type, error);
    }
}

async fn cmd_watch(app: &App, once: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = BackgroundScheduler::builder(app.config.scheduler.clone(), Arc::clone(&app.planner))
        .notifier(move |report: OperationReport| {
            info!(operation_type = %report.operation_type, status = ?report.status, "Operation finished");
            let _ = tx.send(report);
        })
        .build();

    if let Some(plan) = app.load_plan(Local::now().date_naive())? {
        scheduler.set_current_plan(plan);
    }

    if once {
        let queued = scheduler.poll_once().await?;
        println!("Queued {} operation(s)", queued);
        scheduler.run_pending().await;
        while let Ok(report) = rx.try_recv() {
            print_report(&report);
        }
        if let Some(plan) = scheduler.current_plan() {
            app.save_plan(&plan)?;
        }
        return Ok(());
    }

    scheduler.start();
    println!("Watching for blocking tasks, press Ctrl-C to stop");
    loop {
        tokio::select! {
            report = rx.recv() => match report {
                Some(report) => print_report(&report),
                None => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Ctrl-C received, stopping scheduler");
                break;
            }
        }
    }
    scheduler.stop().await;

    if let Some(plan) = scheduler.current_plan() {
        app.save_plan(&plan)?;
    }
    Ok(())
}
