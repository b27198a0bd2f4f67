//! `bulletin` CLI — list what is active on a community bulletin board.
//!
//! ## Usage
//!
//! ```sh
//! # Everything active today in the site timezone (snapshot on stdin)
//! cat board.json | bulletin --timezone America/Chicago active
//!
//! # Only promotions running on a given day, as JSON
//! bulletin active -i board.json --date 2024-07-01 --kind promotions --json
//!
//! # Home-page digest with three items per section
//! bulletin digest -i board.json --limit 3
//!
//! # Validate date ranges and recurrence rules
//! bulletin check -i board.json
//! ```
//!
//! The site timezone comes from `--timezone` or `SITE_TIMEZONE` and the log
//! filter from `--log-level` or `RUST_LOG`. Logs go to stderr.

use activity_engine::{filter_active, Board, Listing, ListingKind, SiteCalendar, DEFAULT_DIGEST_LIMIT};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bulletin",
    version,
    about = "Community bulletin board activity CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// IANA timezone of the site, fixed for the whole run
    #[arg(long, global = true, env = "SITE_TIMEZONE", default_value = "UTC")]
    timezone: String,

    /// Log filter directive (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List listings active on a date
    Active {
        /// Board snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Query date as YYYY-MM-DD (defaults to today in the site timezone)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Restrict output to one kind of listing
        #[arg(short, long, value_enum, default_value_t = KindFilter::All)]
        kind: KindFilter,
        /// Print JSON instead of one line per listing
        #[arg(long)]
        json: bool,
    },
    /// Print the home-page digest as JSON
    Digest {
        /// Board snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Query date as YYYY-MM-DD (defaults to today in the site timezone)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Items per section
        #[arg(short, long, default_value_t = DEFAULT_DIGEST_LIMIT)]
        limit: usize,
    },
    /// Validate date ranges and recurrence rules of every listing
    Check {
        /// Board snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindFilter {
    All,
    Specials,
    Events,
    Promotions,
}

impl KindFilter {
    fn accepts(self, kind: ListingKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Specials => kind == ListingKind::Special,
            KindFilter::Events => kind == ListingKind::Event,
            KindFilter::Promotions => kind == ListingKind::Promotion,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let calendar = SiteCalendar::from_name(&cli.timezone)
        .with_context(|| format!("Unknown site timezone: {}", cli.timezone))?;

    match cli.command {
        Commands::Active {
            input,
            date,
            kind,
            json,
        } => {
            let board = load_board(input.as_deref())?.published();
            let on = resolve_date(date, &calendar);

            let candidates: Vec<Listing> = board
                .listings()
                .into_iter()
                .filter(|l| kind.accepts(l.kind()))
                .collect();
            let active = filter_active(&candidates, on, &calendar);

            if json {
                println!("{}", serde_json::to_string_pretty(&active)?);
            } else if active.is_empty() {
                println!("No active listings on {}.", on);
            } else {
                for listing in &active {
                    println!("{}", describe(listing));
                }
            }
        }
        Commands::Digest { input, date, limit } => {
            let board = load_board(input.as_deref())?;
            let on = resolve_date(date, &calendar);
            let digest = board.digest(on, &calendar, limit);
            println!("{}", serde_json::to_string_pretty(&digest)?);
        }
        Commands::Check { input } => {
            let board = load_board(input.as_deref())?;
            let problems = board.problems();
            if problems.is_empty() {
                println!("All {} listings are valid.", board.len());
            } else {
                for problem in &problems {
                    println!(
                        "{}\t{}\t{}",
                        problem.listing.kind(),
                        problem.listing.slug(),
                        problem.error
                    );
                }
                anyhow::bail!(
                    "{} of {} listings failed validation",
                    problems.len(),
                    board.len()
                );
            }
        }
    }

    Ok(())
}

fn init_logging(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("Invalid log filter: {}", directive))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

/// The explicit date if given, otherwise today in the site timezone.
fn resolve_date(date: Option<NaiveDate>, calendar: &SiteCalendar) -> NaiveDate {
    let on = date.unwrap_or_else(|| calendar.today());
    debug!(date = %on, timezone = %calendar, "resolved query date");
    on
}

/// One tab-separated line: kind, slug, title, and when the listing runs.
fn describe(listing: &Listing) -> String {
    let when = match listing {
        Listing::Special(s) => format!("{} to {}", s.dates.start_date, s.dates.end_date),
        Listing::Event(e) => match e.start_time {
            Some(time) => format!("{} to {} from {}", e.dates.start_date, e.dates.end_date, time),
            None => format!("{} to {}", e.dates.start_date, e.dates.end_date),
        },
        Listing::Promotion(p) => match &p.schedule.recurrence {
            Some(rule) => rule.to_string(),
            None => "Every day".to_string(),
        },
    };
    format!(
        "{}\t{}\t{}\t{}",
        listing.kind(),
        listing.slug(),
        listing.title(),
        when
    )
}

fn load_board(path: Option<&str>) -> Result<Board> {
    let json = read_input(path)?;
    let board = Board::from_json(&json).context("Failed to parse board snapshot")?;
    debug!(listings = board.len(), "loaded board snapshot");
    Ok(board)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
