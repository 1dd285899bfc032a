mod board;
mod config;
mod db;
mod display;
mod filters;
mod models;
mod query;
mod saved;
mod selection;
mod tui;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use board::JobBoard;
use config::{Config, DEFAULT_API_URL};
use db::Database;
use display::{format_job_type, time_since};
use filters::{FacetKind, FilterState, FilterUpdate, SortMode};
use models::JobId;
use query::{FetchOutcome, HttpJobSource, JobSource};
use saved::SavedJobsStore;
use selection::LayoutClass;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Search, browse and save job postings")]
struct Cli {
    /// Base URL of the jobs API (requests go to <url>/jobs)
    #[arg(long, global = true, env = "JOBBOARD_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Path to the local database holding saved jobs
    #[arg(long, global = true, env = "JOBBOARD_DB")]
    db: Option<PathBuf>,

    /// Request timeout in seconds (no timeout when unset)
    #[arg(long, global = true, env = "JOBBOARD_TIMEOUT")]
    timeout: Option<u64>,

    /// Ignore responses to superseded searches
    #[arg(long, global = true)]
    latest_only: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse jobs interactively (default)
    Browse {
        /// Initial search text
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Run one search and print the results
    Search {
        /// Free-text search
        query: Option<String>,

        /// Location filter
        #[arg(short, long)]
        location: Option<String>,

        /// Job type (FULL_TIME, PART_TIME, CONTRACT, FREELANCE, INTERNSHIP); repeatable
        #[arg(short = 't', long = "type")]
        job_type: Vec<String>,

        /// Experience level (e.g. "1-3 tahun"); repeatable
        #[arg(short, long)]
        experience: Vec<String>,

        /// Sort order (latest, salary, popular)
        #[arg(short, long, default_value = "latest")]
        sort: String,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Manage saved jobs
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved job ids
    List,

    /// Save a job, or unsave it if already saved
    Toggle {
        /// Job ID
        id: String,
    },
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // The terminal belongs to the UI, so logs go to a file.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobboard=info")))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::new(cli.api_url, cli.db, cli.timeout, cli.latest_only);
    init_logging(&config.log_path)?;

    let db = Database::open(&config.db_path)?;

    match cli.command.unwrap_or(Commands::Browse {
        search: String::new(),
    }) {
        Commands::Browse { search } => {
            let source: Arc<dyn JobSource> =
                Arc::new(HttpJobSource::new(&config.api_url, config.timeout)?);
            let saved = SavedJobsStore::load(db);
            let ordering = config.ordering;
            tui::run_browse(source, move |layout| {
                JobBoard::mount(saved, FilterState::with_search(&search), layout, ordering)
            })?;
        }

        Commands::Search {
            query,
            location,
            job_type,
            experience,
            sort,
            page,
        } => {
            let sort = SortMode::parse(&sort)
                .ok_or_else(|| anyhow!("Unknown sort '{}'. Use latest, salary or popular", sort))?;

            let mut filters = FilterState::with_search(query.as_deref().unwrap_or(""));
            filters.apply(FilterUpdate::Location(location.unwrap_or_default()));
            filters.apply(FilterUpdate::Sort(sort));
            for t in job_type {
                filters.apply(FilterUpdate::ToggleFacet(FacetKind::JobType, t.to_uppercase()));
            }
            for e in experience {
                filters.apply(FilterUpdate::ToggleFacet(FacetKind::Experience, e));
            }

            let source = HttpJobSource::new(&config.api_url, config.timeout)?;
            let saved = SavedJobsStore::load(db);
            let (mut board, initial) =
                JobBoard::mount(saved, filters, LayoutClass::Narrow, config.ordering);
            let pending = board.set_page(page).unwrap_or(initial);

            let result = source.search(&pending.query);
            if board.complete_fetch(pending.seq, result) == FetchOutcome::Failed {
                let reason = board.last_error().unwrap_or("unknown error").to_string();
                return Err(anyhow!("Search failed: {}", reason));
            }

            let jobs = board.results();
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<2} {:<8} {:<11} {:<30} {:<20} {:<14} {:>12}",
                    "", "ID", "TYPE", "TITLE", "COMPANY", "LOCATION", "POSTED"
                );
                println!("{}", "-".repeat(103));
                let now = Utc::now();
                for job in jobs {
                    let saved = if board.is_saved(&job.id) { "*" } else { "" };
                    println!(
                        "{:<2} {:<8} {:<11} {:<30} {:<20} {:<14} {:>12}",
                        saved,
                        truncate(&job.id.to_string(), 8),
                        truncate(format_job_type(&job.job_type), 11),
                        truncate(&job.title, 28),
                        truncate(&job.company, 18),
                        truncate(&job.location, 14),
                        time_since(job.posted_date, now)
                    );
                }
                let pager = board.pager();
                println!(
                    "\nPage {} of {} ({} jobs, {} per page)",
                    pager.page,
                    pager.total_pages.max(1),
                    pager.total_count,
                    pager.limit
                );
            }
        }

        Commands::Saved { command } => {
            let path = db.path().clone();
            let mut saved = SavedJobsStore::load(db);
            match command {
                SavedCommands::List => {
                    if saved.ids().is_empty() {
                        println!("No saved jobs.");
                    } else {
                        println!("Saved jobs ({}) in {}", saved.ids().len(), path.display());
                        for id in saved.ids() {
                            println!("  {}", id);
                        }
                    }
                }

                SavedCommands::Toggle { id } => {
                    let id = JobId::parse(&id);
                    if saved.toggle(&id) {
                        println!("Saved job {}.", id);
                    } else {
                        println!("Removed job {} from saved jobs.", id);
                    }
                }
            }
        }
    }

    Ok(())
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

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Senior Backend Engineer", 10), "Senior ...");
        assert_eq!(truncate("Désign Léad", 8), "Désig...");
    }

    #[test]
    fn test_cli_parses_search_flags() {
        let cli = Cli::try_parse_from([
            "jobboard", "search", "rust", "-l", "Jakarta", "-t", "full_time", "-t", "CONTRACT",
            "-e", "1-3 tahun", "--sort", "popular", "--page", "2", "--latest-only",
        ])
        .unwrap();
        assert!(cli.latest_only);
        match cli.command {
            Some(Commands::Search { query, job_type, page, sort, .. }) => {
                assert_eq!(query.as_deref(), Some("rust"));
                assert_eq!(job_type, vec!["full_time", "CONTRACT"]);
                assert_eq!(page, 2);
                assert_eq!(sort, "popular");
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_cli_defaults_to_browse() {
        let cli = Cli::try_parse_from(["jobboard"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.latest_only);
    }
}
