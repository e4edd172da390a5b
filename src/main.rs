mod checker;
mod config;
mod convert;
mod documents;
mod docx;
mod errors;
mod extract;
mod fetch;
mod layout;
mod letter;
mod markdown;
mod models;
mod pdf;
mod pool;
mod scan;
mod store;
mod tracker;
mod tui;
mod web;

use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use checker::{CheckSummary, UrlState};
use config::Config;
use convert::{Format, Kind};
use fetch::{HttpFetcher, CHECK_TIMEOUT, SCAN_TIMEOUT};
use models::{InterviewStage, JobRecord, Priority, Status, DATE_FORMAT};
use pool::DEFAULT_WORKERS;
use scan::{ScanConfig, ScanReport};
use tracker::{followups, Stats, Tracker};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job search toolkit - scan career pages, track applications, build documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check tracked job URLs for closed postings
    Check {
        /// Also re-check jobs already marked Position Closed
        #[arg(long)]
        all: bool,

        /// Mark closed postings as Position Closed in the tracker
        #[arg(long)]
        update: bool,

        /// Show every result, not just closed postings
        #[arg(short, long)]
        verbose: bool,

        /// Number of parallel fetches
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },

    /// Scan configured career pages for new postings
    Scan {
        /// Print saved search queries for manual re-running
        #[arg(long)]
        show_queries: bool,

        /// Show previously seen postings and page errors inline
        #[arg(short, long)]
        verbose: bool,

        /// Record every current posting as seen
        #[arg(long)]
        update_seen: bool,

        /// Number of parallel fetches
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },

    /// View and edit the job tracker
    Tracker {
        #[command(subcommand)]
        command: TrackerCommands,
    },

    /// Convert markdown resumes and cover letters
    Convert {
        #[command(subcommand)]
        command: ConvertCommands,
    },

    /// Run the web interface
    Serve {
        /// Port to listen on (default: PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum TrackerCommands {
    /// List all jobs
    List,

    /// List jobs that have been applied to
    Applied,

    /// List jobs not yet applied to
    Pending,

    /// Show upcoming follow-ups
    Followups,

    /// Show application statistics
    Stats,

    /// Add a job
    Add {
        #[arg(long)]
        company: String,

        #[arg(long)]
        position: String,

        #[arg(long)]
        location: Option<String>,

        /// Base salary
        #[arg(long)]
        salary: Option<String>,

        /// Total compensation estimate
        #[arg(long)]
        total_comp: Option<String>,

        /// Job posting URL
        #[arg(long)]
        url: Option<String>,

        /// Critical, High, Medium or Low (default: Medium)
        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        notes: Option<String>,

        /// Applied date (YYYY-MM-DD)
        #[arg(long)]
        applied: Option<NaiveDate>,
    },

    /// Update a job by its number in `tracker list`
    Update {
        /// Job number
        number: usize,

        /// New status, e.g. "Phone Screen Scheduled"
        #[arg(long)]
        status: Option<Status>,

        /// Applied date (YYYY-MM-DD)
        #[arg(long)]
        applied: Option<NaiveDate>,

        #[arg(long)]
        contact_name: Option<String>,

        #[arg(long)]
        contact_email: Option<String>,

        #[arg(long)]
        contact_phone: Option<String>,

        /// Last contact date (YYYY-MM-DD)
        #[arg(long)]
        last_contact: Option<NaiveDate>,

        /// Next follow-up date (YYYY-MM-DD)
        #[arg(long)]
        follow_up: Option<NaiveDate>,

        /// Interview stage, e.g. "Recruiter Screen"
        #[arg(long)]
        stage: Option<InterviewStage>,

        /// Append a dated note
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a job
    Delete {
        /// Job number
        number: usize,
    },

    /// Hide a job from the default views
    Hide {
        /// Job number
        number: usize,

        /// Why the job is hidden
        #[arg(short, long, default_value = "Other")]
        reason: String,
    },

    /// Restore a hidden job
    Unhide {
        /// Job number
        number: usize,
    },

    /// Browse the tracker interactively
    Browse,
}

#[derive(Subcommand)]
enum ConvertCommands {
    /// Convert resumes (DOCX by default)
    Resume {
        /// Markdown file to convert
        file: Option<PathBuf>,

        /// Convert every resume in the resumes directory
        #[arg(long)]
        all: bool,

        /// Write PDF instead of DOCX
        #[arg(long)]
        pdf: bool,

        /// Output directory (default: the resumes directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert cover letters (PDF by default)
    CoverLetter {
        /// Markdown file to convert
        file: Option<PathBuf>,

        /// Convert every cover letter in the cover letters directory
        #[arg(long)]
        all: bool,

        /// Write DOCX instead of PDF
        #[arg(long)]
        docx: bool,

        /// Output directory (default: the cover letters directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let tracker = Tracker::new(config.tracker_path.clone());

    match cli.command {
        Commands::Check {
            all,
            update,
            verbose,
            workers,
        } => {
            tracker.ensure_exists()?;
            run_check(&tracker, all, update, verbose, workers)?;
        }

        Commands::Scan {
            show_queries,
            verbose,
            update_seen,
            workers,
        } => {
            let path = &config.scan_config_path;
            if !path.exists() {
                bail!(
                    "{} not found\nCreate job_search_config.json with your career pages and queries.",
                    path.display()
                );
            }
            let mut scan_config = ScanConfig::load(path)?;
            run_scan(&tracker, &mut scan_config, path, verbose, update_seen, workers)?;
            if show_queries {
                print_queries(&scan_config);
            }
        }

        Commands::Tracker { command } => run_tracker(&tracker, command)?,

        Commands::Convert { command } => match command {
            ConvertCommands::Resume {
                file,
                all,
                pdf,
                output,
            } => {
                let format = if pdf { Format::Pdf } else { Format::Docx };
                run_convert(Kind::Resume, format, file, all, output, &config.resumes_dir)?;
            }
            ConvertCommands::CoverLetter {
                file,
                all,
                docx,
                output,
            } => {
                let format = if docx { Format::Docx } else { Format::Pdf };
                run_convert(Kind::CoverLetter, format, file, all, output, &config.cover_letters_dir)?;
            }
        },

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            tracker.ensure_exists()?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::serve(config))?;
        }
    }

    Ok(())
}

fn run_check(tracker: &Tracker, all: bool, update: bool, verbose: bool, workers: usize) -> Result<()> {
    let mut jobs = tracker.load()?;
    let targets = checker::select_targets(&jobs, all);
    if targets.is_empty() {
        println!("No jobs to check.");
        return Ok(());
    }

    println!("Checking {} job URLs...\n", targets.len());
    let fetcher = HttpFetcher::new(CHECK_TIMEOUT)?;
    let results = checker::run_checks(&fetcher, targets, workers);

    for result in &results {
        let label = &result.target.label;
        let tag = match result.check.state {
            UrlState::Closed => "CLOSED",
            UrlState::Open => "OPEN",
            _ => "???",
        };
        if result.check.state == UrlState::Closed || verbose {
            println!("  {:<7} {}", tag, label);
            if verbose {
                println!("          {}", result.check.detail);
            }
        }
    }

    let summary = CheckSummary::tally(&results);
    println!(
        "\n  Open: {}  |  Closed: {}  |  Could not verify: {}",
        summary.open, summary.closed, summary.unverified
    );

    if update && summary.closed > 0 {
        let changed = checker::mark_closed(&mut jobs, &results);
        tracker.save(&jobs)?;
        println!(
            "\nUpdated {} jobs to \"Position Closed\" in {}",
            changed,
            file_name(tracker.path())
        );
    } else if summary.closed > 0 {
        println!("\nRun with --update to mark closed jobs in the CSV.");
    }
    Ok(())
}

fn run_scan(
    tracker: &Tracker,
    scan_config: &mut ScanConfig,
    path: &Path,
    verbose: bool,
    update_seen: bool,
    workers: usize,
) -> Result<()> {
    if scan_config.career_pages.is_empty() {
        println!("No career pages configured.");
        return Ok(());
    }

    let tracked = tracker.tracked_urls()?;
    let today = Local::now().format(DATE_FORMAT).to_string();
    let fetcher = HttpFetcher::new(SCAN_TIMEOUT)?;

    println!("Scanning {} career pages...\n", scan_config.career_pages.len());
    let report = scan::run_scan(scan_config, &tracked, &fetcher, workers, update_seen, &today);
    print_scan_report(&report, verbose);

    let (new_total, seen_total) = (report.new_count(), report.seen_count());
    if update_seen {
        scan_config.save(path)?;
        println!("\n  Updated checked_urls with {} entries.", new_total + seen_total);
    } else if new_total > 0 {
        println!("\n  Run with --update-seen to mark these as reviewed.");
    }
    Ok(())
}

fn print_scan_report(report: &ScanReport, verbose: bool) {
    for company in &report.companies {
        if let Some(error) = &company.error {
            if verbose {
                println!("  ERROR   {}: {}", company.company, error);
            }
            continue;
        }

        let new = &company.postings.new;
        let seen = &company.postings.seen;
        if !new.is_empty() {
            println!("  {} - {} NEW posting(s):", company.company, new.len());
            for posting in new {
                println!("    * {}", posting.title);
                println!("      {}", posting.url);
            }
        }
        if verbose && !seen.is_empty() {
            println!("  {} - {} previously seen:", company.company, seen.len());
            for posting in seen {
                println!("    . {}", posting.title);
                println!("      {}", posting.url);
            }
        }
        if new.is_empty() && !verbose {
            if seen.is_empty() {
                println!("  {} - no matching jobs found", company.company);
            } else {
                println!("  {} - {} jobs (all previously seen)", company.company, seen.len());
            }
        }
    }

    let errors: Vec<(&str, &str)> = report.errors().collect();
    println!(
        "\n  New: {}  |  Previously seen: {}  |  Errors: {}",
        report.new_count(),
        report.seen_count(),
        errors.len()
    );
    if !errors.is_empty() {
        println!("\n  Pages with errors:");
        for (company, error) in errors {
            println!("    {}: {}", company, error);
        }
    }
}

fn print_queries(scan_config: &ScanConfig) {
    let queries = &scan_config.search_queries;
    if queries.is_empty() {
        println!("No search queries configured.");
        return;
    }

    println!("\nSaved search queries ({}):", queries.len());
    println!("Copy these into your search engine.\n");
    for (i, query) in queries.iter().enumerate() {
        println!("  {:2}. {}", i + 1, query);
    }

    if !scan_config.filters.is_empty() {
        println!("\nFilter criteria (for reference):");
        for (key, value) in &scan_config.filters {
            match value {
                Value::String(s) => println!("  {}: {}", key, s),
                other => println!("  {}: {}", key, other),
            }
        }
    }
}

/// CLI job numbers are 1-based, matching `tracker list`.
fn row_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Job numbers start at 1"))
}

fn run_tracker(tracker: &Tracker, command: TrackerCommands) -> Result<()> {
    if !matches!(command, TrackerCommands::Add { .. }) {
        tracker.ensure_exists()?;
    }

    match command {
        TrackerCommands::List => {
            let jobs = tracker.load()?;
            print_jobs(jobs.iter().enumerate(), "All Jobs");
        }

        TrackerCommands::Applied => {
            let jobs = tracker.load()?;
            let rows = jobs.iter().enumerate().filter(|(_, job)| job.status != Status::NotApplied);
            print_jobs(rows, "Applied");
        }

        TrackerCommands::Pending => {
            let jobs = tracker.load()?;
            let rows = jobs.iter().enumerate().filter(|(_, job)| job.status == Status::NotApplied);
            print_jobs(rows, "Not Yet Applied");
        }

        TrackerCommands::Followups => {
            let jobs = tracker.load()?;
            let due = followups(&jobs, true);
            if due.is_empty() {
                println!("No follow-ups scheduled.");
            } else {
                println!("{:<12} {:<24} {:<30} {:<30}", "DATE", "COMPANY", "POSITION", "CONTACT");
                println!("{}", "-".repeat(99));
                for (_, job) in due {
                    let mut contact = job.contact_name.clone();
                    if !job.contact_email.is_empty() {
                        contact = format!("{} <{}>", contact, job.contact_email).trim().to_string();
                    }
                    println!(
                        "{:<12} {:<24} {:<30} {:<30}",
                        job.next_follow_up,
                        truncate(&job.company, 22),
                        truncate(&job.position, 28),
                        contact
                    );
                }
            }
        }

        TrackerCommands::Stats => {
            let stats = Stats::compute(&tracker.load()?);
            println!("Total jobs tracked:     {}", stats.total);
            println!("Applied:                {}", stats.applied);
            println!("Not yet applied:        {}", stats.not_applied);
            println!("Interviewing:           {}", stats.interviewing);
            println!("Offers:                 {}", stats.offers);
            println!("Rejected/No Response:   {}", stats.rejected);
            println!("Response rate:          {}", stats.response_rate_label());
        }

        TrackerCommands::Add {
            company,
            position,
            location,
            salary,
            total_comp,
            url,
            priority,
            notes,
            applied,
        } => {
            let mut job = JobRecord::new(company.trim(), position.trim());
            job.location = location.unwrap_or_default();
            job.salary_base = salary.unwrap_or_default();
            job.total_comp = total_comp.unwrap_or_default();
            job.job_url = url.unwrap_or_default();
            job.priority = Some(priority.unwrap_or(Priority::Medium));
            job.notes = notes.unwrap_or_default();
            if let Some(date) = applied {
                job.applied_date = date.format(DATE_FORMAT).to_string();
            }
            let job = tracker.add(job)?;
            println!("Added: {} ({})", job.label(), job.status);
        }

        TrackerCommands::Update {
            number,
            status,
            applied,
            contact_name,
            contact_email,
            contact_phone,
            last_contact,
            follow_up,
            stage,
            note,
        } => {
            let index = row_index(number)?;
            let today = Local::now().date_naive();
            let date = |d: NaiveDate| d.format(DATE_FORMAT).to_string();
            let updated = tracker
                .modify(index, |job| {
                    if let Some(status) = status {
                        job.status = status;
                    }
                    if let Some(d) = applied {
                        job.applied_date = date(d);
                    }
                    if let Some(name) = contact_name {
                        job.contact_name = name;
                    }
                    if let Some(email) = contact_email {
                        job.contact_email = email;
                    }
                    if let Some(phone) = contact_phone {
                        job.contact_phone = phone;
                    }
                    if let Some(d) = last_contact {
                        job.last_contact_date = date(d);
                    }
                    if let Some(d) = follow_up {
                        job.next_follow_up = date(d);
                    }
                    if let Some(stage) = stage {
                        job.interview_stage = Some(stage);
                    }
                    if let Some(note) = &note {
                        job.append_note(note, today);
                    }
                })?
                .ok_or_else(|| anyhow!("Job #{} not found", number))?;
            println!("Updated: {} ({})", updated.label(), updated.status);
        }

        TrackerCommands::Delete { number } => {
            let removed = tracker
                .delete(row_index(number)?)?
                .ok_or_else(|| anyhow!("Job #{} not found", number))?;
            println!("Deleted: {}", removed.label());
        }

        TrackerCommands::Hide { number, reason } => {
            let job = tracker
                .hide(row_index(number)?, &reason)?
                .ok_or_else(|| anyhow!("Job #{} not found", number))?;
            println!("Hidden: {} ({})", job.label(), job.hide_reason);
        }

        TrackerCommands::Unhide { number } => {
            let job = tracker
                .unhide(row_index(number)?)?
                .ok_or_else(|| anyhow!("Job #{} not found", number))?;
            println!("Restored: {}", job.label());
        }

        TrackerCommands::Browse => tui::run_browse(tracker)?,
    }
    Ok(())
}

fn print_jobs<'a>(rows: impl Iterator<Item = (usize, &'a JobRecord)>, title: &str) {
    let rows: Vec<(usize, &JobRecord)> = rows.collect();
    if rows.is_empty() {
        println!("No jobs found.");
        return;
    }

    println!("{} ({})\n", title, rows.len());
    println!(
        "{:<4} {:<22} {:<30} {:<24} {:<9} {:<10}",
        "#", "COMPANY", "POSITION", "STATUS", "PRIORITY", "FOLLOW-UP"
    );
    println!("{}", "-".repeat(104));
    for (index, job) in rows {
        let marker = if job.hidden { "h" } else { "" };
        println!(
            "{:<4} {:<22} {:<30} {:<24} {:<9} {:<10}",
            format!("{}{}", index + 1, marker),
            truncate(&job.company, 20),
            truncate(&job.position, 28),
            truncate(job.status.as_str(), 22),
            job.priority.as_ref().map(|p| p.as_str()).unwrap_or("-"),
            job.next_follow_up
        );
    }
}

fn run_convert(
    kind: Kind,
    format: Format,
    file: Option<PathBuf>,
    all: bool,
    output: Option<PathBuf>,
    default_dir: &Path,
) -> Result<()> {
    let output_dir = output.unwrap_or_else(|| default_dir.to_path_buf());

    if all {
        if !default_dir.is_dir() {
            bail!("{} not found", default_dir.display());
        }
        let total = convert::markdown_files(default_dir)?.len();
        if total == 0 {
            bail!("No markdown files found in {}", default_dir.display());
        }

        println!("Converting {} {} to {}...\n", total, kind.plural(), format);
        let outcome = convert::convert_all(kind, format, default_dir, &output_dir)?;
        for (input, written) in &outcome.converted {
            println!("  OK    {} -> {}", file_name(input), file_name(written));
        }
        for (input, error) in &outcome.failed {
            println!("  FAIL  {}: {}", file_name(input), error);
        }
        println!(
            "\nDone! {} {} converted to {}/",
            outcome.converted.len(),
            kind.plural(),
            output_dir.display()
        );
        return Ok(());
    }

    let Some(file) = file else {
        bail!("Give a markdown file to convert, or --all");
    };
    let written = convert::convert_file(kind, format, &file, &output_dir)?;
    println!("Converted: {} -> {}", file_name(&file), written.display());
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_row_index_is_one_based() {
        assert_eq!(row_index(1).unwrap(), 0);
        assert!(row_index(0).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Acme", 10), "Acme");
        assert_eq!(truncate("Initech Holdings", 10), "Initech...");
    }

    #[test]
    fn test_update_parses_labels() {
        let cli = Cli::try_parse_from([
            "jobtrack",
            "tracker",
            "update",
            "2",
            "--status",
            "Phone Screen Scheduled",
            "--applied",
            "2024-03-01",
        ])
        .unwrap();
        let Commands::Tracker {
            command: TrackerCommands::Update { number, status, applied, .. },
        } = cli.command
        else {
            panic!("expected tracker update");
        };
        assert_eq!(number, 2);
        assert_eq!(status, Some(Status::PhoneScreenScheduled));
        assert_eq!(applied, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_add_defaults_priority_to_medium() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Tracker::new(dir.path().join("job_tracker.csv"));
        let cli = Cli::try_parse_from([
            "jobtrack", "tracker", "add", "--company", "Acme", "--position", "SRE",
        ])
        .unwrap();
        let Commands::Tracker { command } = cli.command else {
            panic!("expected tracker add");
        };
        run_tracker(&tracker, command).unwrap();

        let jobs = tracker.load().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].priority, Some(Priority::Medium));
        assert_eq!(jobs[0].status, Status::NotApplied);
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        let parsed = Cli::try_parse_from([
            "jobtrack", "tracker", "add", "--company", "Acme", "--position", "SRE", "--priority", "Urgent",
        ]);
        assert!(parsed.is_err());
    }
}
