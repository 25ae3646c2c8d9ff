use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use songlink::config::{AppConfig, ResolverConfig};
use songlink::db::models::NewEntry;
use songlink::db::{Database, LogStore};
use songlink::fetch::StaticFetcher;
use songlink::identity::{DuplicateStatus, KnownEntry, find_duplicate};
use songlink::resolver::{ResolvedFact, TrackResolver};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "songlink", version, about = "Resolve song share links and keep a listening log")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a share link and print the response as JSON
    Resolve {
        url: String,

        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Resolve a share link and add it to the log
    Add {
        url: String,

        /// Free-text note
        #[arg(long, default_value = "")]
        note: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Rating from 0 (unrated) to 5
        #[arg(short, long, default_value = "0")]
        rating: u8,

        /// Add even if the song is already logged
        #[arg(long)]
        force: bool,

        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Check whether a share link is already in the log
    Check {
        url: String,

        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Show the most recent log entries
    List {
        /// Number of entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show log statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Resolve { url, html } => {
            let resolver = build_resolver(&config.resolver, html.as_deref())?;
            let spinner = fetch_spinner(&url, html.is_none());
            let response = songlink::api::respond(Some(&url), &resolver);
            spinner.finish_and_clear();

            let json = serde_json::to_string_pretty(&response.body)
                .context("Failed to encode response")?;
            println!("{json}");
            if !response.is_ok() {
                log::info!("Resolution answered HTTP {}", response.status);
                std::process::exit(1);
            }
        }

        Commands::Add { url, note, tags, rating, force, html } => {
            let resolver = build_resolver(&config.resolver, html.as_deref())?;
            let fact = resolve_with_spinner(&resolver, &url, html.is_none())?;
            let db = open_db(cli.db_path, &config)?;

            let entries = db.load_entries().context("Failed to load log")?;
            let known: Vec<KnownEntry> = entries.iter().map(KnownEntry::from).collect();
            let (status, index) = find_duplicate(&fact, &known);

            if status.is_blocking() && !force {
                let existing = index.map(|i| &entries[i]);
                anyhow::bail!(
                    "\"{}\" is already logged{}. Use --force to add it anyway.",
                    fact.title,
                    existing
                        .map(|e| format!(" (entry {}, {})", e.id, e.created_at.format("%Y-%m-%d")))
                        .unwrap_or_default()
                );
            }
            match status {
                DuplicateStatus::Duplicate => {
                    log::warn!("Adding duplicate of \"{}\" (--force)", fact.title);
                }
                DuplicateStatus::Uncertain => {
                    log::warn!("Could not tell whether {url} is already logged; adding it");
                }
                DuplicateStatus::New => {}
            }

            let entry = NewEntry {
                note,
                tags,
                rating,
                ..NewEntry::from_fact(&fact)
            };
            let saved = db.save_entry(&entry).context("Failed to save entry")?;
            println!("Added: {}", describe(&fact));
            println!("  id: {}", saved.id);
        }

        Commands::Check { url, html } => {
            let resolver = build_resolver(&config.resolver, html.as_deref())?;
            let fact = resolve_with_spinner(&resolver, &url, html.is_none())?;
            let db = open_db(cli.db_path, &config)?;

            let known = db.known_entries().context("Failed to load log")?;
            let (status, _) = find_duplicate(&fact, &known);
            println!("{status}: {}", describe(&fact));
        }

        Commands::List { limit } => {
            let db = open_db(cli.db_path, &config)?;
            let entries = db.recent_entries(limit).context("Query failed")?;

            if entries.is_empty() {
                println!("Log is empty. Add a song with `songlink add <URL>`.");
                return Ok(());
            }

            println!(
                "{:<10} {:<30} {:<24} {:>6} {:>12}",
                "Date", "Title", "Artist", "Rating", "Track ID"
            );
            println!("{}", "-".repeat(86));

            for e in &entries {
                println!(
                    "{:<10} {:<30} {:<24} {:>6} {:>12}",
                    e.created_at.format("%Y-%m-%d"),
                    truncate(&e.title, 30),
                    truncate(&e.artist, 24),
                    stars(e.rating),
                    e.track_id.as_deref().unwrap_or("-"),
                );
            }
        }

        Commands::Stats => {
            let db = open_db(cli.db_path, &config)?;
            let stats = db.stats().context("Failed to get stats")?;
            println!("Log Statistics");
            println!("==============");
            println!("Total entries:     {}", stats.total_entries);
            println!("With track ID:     {}", stats.with_track_id);
            println!("Distinct artists:  {}", stats.distinct_artists);
            match stats.mean_rating {
                Some(mean) => println!(
                    "Rated entries:     {} (mean {:.1})",
                    stats.rated_entries, mean
                ),
                None => println!("Rated entries:     0"),
            }
            println!();

            if !stats.artists.is_empty() {
                println!("Artists:");
                for (artist, count) in &stats.artists {
                    println!("  {:<30} {}", truncate(artist, 30), count);
                }
                println!();
            }

            if !stats.tags.is_empty() {
                println!("Tags:");
                for (tag, count) in &stats.tags {
                    println!("  {:<30} {}", truncate(tag, 30), count);
                }
            }
        }
    }

    Ok(())
}

/// Open the log database. Path precedence: CLI > config > XDG default.
fn open_db(cli_path: Option<PathBuf>, config: &AppConfig) -> Result<Database> {
    let db_path = cli_path
        .or(config.db_path.clone())
        .unwrap_or_else(songlink::config::default_db_path);
    log::info!("Database: {}", db_path.display());

    Database::open(&db_path).context("Failed to open database")
}

/// Resolver over HTTP, or over a saved page when `html` is given.
fn build_resolver(config: &ResolverConfig, html: Option<&Path>) -> Result<TrackResolver> {
    match html {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(TrackResolver::new(
                config.clone(),
                Box::new(StaticFetcher::ok(body)),
            ))
        }
        None => Ok(TrackResolver::with_http(config.clone())),
    }
}

fn fetch_spinner(url: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap());
    pb.set_message(format!("Fetching {url}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn resolve_with_spinner(resolver: &TrackResolver, url: &str, visible: bool) -> Result<ResolvedFact> {
    let spinner = fetch_spinner(url, visible);
    let result = resolver.resolve(url);
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to resolve {url}"))
}

fn describe(fact: &ResolvedFact) -> String {
    match (fact.artist.is_empty(), &fact.track_id) {
        (true, None) => fact.title.clone(),
        (true, Some(id)) => format!("{} [{id}]", fact.title),
        (false, None) => format!("{} / {}", fact.title, fact.artist),
        (false, Some(id)) => format!("{} / {} [{id}]", fact.title, fact.artist),
    }
}

/// Cut `s` to at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn stars(rating: u8) -> String {
    if rating == 0 {
        "-".to_string()
    } else {
        "*".repeat(rating as usize)
    }
}
