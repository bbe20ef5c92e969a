use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use games_sqlite::Db;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tv_feed::FeedClient;

mod clean;
mod config;
mod enrich;
mod sweep;

use clean::CleanOptions;
use enrich::EnrichOptions;
use sweep::IngestOptions;

#[derive(Debug, Parser)]
#[command(name = "chesstv", version, about = "Live TV chess game ingestion pipeline")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./chesstv.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database file.
    #[arg(long, global = true, default_value = "tv_games.db")]
    db: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Poll the TV channels and upsert the streamed games
    Ingest {
        /// Total run time budget in seconds
        #[arg(long)]
        time_limit_secs: Option<u64>,
        /// Pause between full sweeps in seconds
        #[arg(long)]
        sleep_interval_secs: Option<u64>,
        /// Upserts per session before the long cool-off
        #[arg(long)]
        max_games: Option<usize>,
        /// Comma-separated channel list (default: bullet,blitz,classical,rapid,ultraBullet)
        #[arg(long)]
        channels: Option<String>,
        /// Upstream base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate and normalize ingested rows
    Clean {
        /// Re-check rows that already passed validation
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Treat the in-progress result "*" as valid instead of deleting it
        #[arg(long, default_value_t = false)]
        accept_wildcard: bool,
    },
    /// Fetch player profiles for games not yet enriched
    EnrichUsers {
        #[arg(long)]
        time_limit_secs: Option<u64>,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Fill in missing opening names and ECO codes
    EnrichOpenings {
        #[arg(long)]
        time_limit_secs: Option<u64>,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Run the full pipeline: ingest, clean, enrich users, enrich openings
    Run {
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Export all games to CSV
    Export {
        /// Output file (overwritten)
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

fn feed_client(base_url: Option<String>, cfg: &Option<config::Config>) -> Result<FeedClient> {
    let base = base_url
        .or_else(|| cfg.as_ref()?.ingest.as_ref()?.base_url.clone())
        .unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string());
    let token = std::env::var("TV_API_TOKEN").ok();
    let client = reqwest::Client::builder()
        .user_agent(concat!("chesstv/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(FeedClient::new(client, base, token))
}

fn ingest_options(
    cfg: &Option<config::Config>,
    time_limit_secs: Option<u64>,
    sleep_interval_secs: Option<u64>,
    max_games: Option<usize>,
    channels: Option<String>,
) -> IngestOptions {
    let icfg = cfg
        .as_ref()
        .and_then(|c| c.ingest.clone())
        .unwrap_or_default();
    let channels = match channels {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => icfg
            .channels
            .unwrap_or_else(|| config::DEFAULT_CHANNELS.iter().map(|s| s.to_string()).collect()),
    };
    IngestOptions {
        channels,
        time_limit: Duration::from_secs(time_limit_secs.or(icfg.time_limit_secs).unwrap_or(90)),
        sleep_interval: Duration::from_secs(
            sleep_interval_secs.or(icfg.sleep_interval_secs).unwrap_or(5),
        ),
        rate_limit_pause: Duration::from_secs(icfg.rate_limit_pause_secs.unwrap_or(900)),
        max_games: max_games.or(icfg.max_games).unwrap_or(5000),
    }
}

fn enrich_options(cfg: &Option<config::Config>, time_limit_secs: Option<u64>) -> EnrichOptions {
    let ecfg = cfg
        .as_ref()
        .and_then(|c| c.enrich.clone())
        .unwrap_or_default();
    EnrichOptions {
        time_limit: Duration::from_secs(time_limit_secs.or(ecfg.time_limit_secs).unwrap_or(3600)),
        throttle: Duration::from_millis(ecfg.throttle_ms.unwrap_or(500)),
        batch_size: ecfg.batch_size.unwrap_or(3000).max(1),
        batch_pause: Duration::from_secs(ecfg.batch_pause_secs.unwrap_or(900)),
    }
}

fn export_csv(db: &Db, out: &Path) -> Result<()> {
    let games = db.all_games()?;
    let mut wtr = csv::Writer::from_writer(std::fs::File::create(out)?);
    wtr.write_record([
        "game_id", "event_name", "site_url", "game_date", "white_id", "black_id", "result",
        "game_date_utc", "game_time_utc", "white_elo", "black_elo", "white_title", "black_title",
        "variant", "time_control", "opening_eco_code", "termination", "moves_pgn", "opening_name",
        "ingested_at",
    ])?;
    for g in &games {
        wtr.write_record(&[
            g.game_id.clone(),
            g.event_name.clone(),
            g.site_url.clone(),
            g.game_date.map(|d| d.to_string()).unwrap_or_default(),
            g.white_id.clone(),
            g.black_id.clone(),
            g.result.clone(),
            g.game_date_utc.map(|d| d.to_string()).unwrap_or_default(),
            g.game_time_utc
                .map(|t| format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()))
                .unwrap_or_default(),
            g.white_elo.map(|v| v.to_string()).unwrap_or_default(),
            g.black_elo.map(|v| v.to_string()).unwrap_or_default(),
            g.white_title.clone(),
            g.black_title.clone(),
            g.variant.clone(),
            g.time_control.clone(),
            g.opening_eco_code.clone(),
            g.termination.clone(),
            g.moves_pgn.clone(),
            g.opening_name.clone(),
            g.ingested_at.format(&Rfc3339).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    info!(games = games.len(), file = %out.display(), "exported games");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let loaded_cfg = config::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Version => {
            println!("chesstv {}", chesstv_core::version());
        }
        Commands::Ingest { time_limit_secs, sleep_interval_secs, max_games, channels, base_url } => {
            let opts = ingest_options(&loaded_cfg, time_limit_secs, sleep_interval_secs, max_games, channels);
            let feed = feed_client(base_url, &loaded_cfg)?;
            let mut db = Db::open_or_create(&cli.db)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sweep::run_ingestion(&feed, &mut db, &opts))?;
        }
        Commands::Clean { force, accept_wildcard } => {
            let ccfg = loaded_cfg
                .as_ref()
                .and_then(|c| c.clean.clone())
                .unwrap_or_default();
            let opts = CleanOptions {
                force_revalidate: force || ccfg.force_revalidate.unwrap_or(false),
                accept_wildcard_result: accept_wildcard || ccfg.accept_wildcard_result.unwrap_or(false),
            };
            let mut db = Db::open_or_create(&cli.db)?;
            clean::run_cleaning(&mut db, &opts)?;
        }
        Commands::EnrichUsers { time_limit_secs, base_url } => {
            let opts = enrich_options(&loaded_cfg, time_limit_secs);
            let feed = feed_client(base_url, &loaded_cfg)?;
            let db = Db::open_or_create(&cli.db)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(enrich::backfill_user_profiles(&feed, &db, &opts))?;
        }
        Commands::EnrichOpenings { time_limit_secs, base_url } => {
            let opts = enrich_options(&loaded_cfg, time_limit_secs);
            let feed = feed_client(base_url, &loaded_cfg)?;
            let db = Db::open_or_create(&cli.db)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(enrich::backfill_opening_names(&feed, &db, &opts))?;
        }
        Commands::Run { base_url } => {
            let feed = feed_client(base_url, &loaded_cfg)?;
            let mut db = Db::open_or_create(&cli.db)?;
            let rt = tokio::runtime::Runtime::new()?;

            let ingest = ingest_options(&loaded_cfg, None, None, None, None);
            info!("tv game ingestion - started");
            rt.block_on(sweep::run_ingestion(&feed, &mut db, &ingest))?;
            info!("tv game ingestion - finished");

            let ccfg = loaded_cfg
                .as_ref()
                .and_then(|c| c.clean.clone())
                .unwrap_or_default();
            let clean_opts = CleanOptions {
                force_revalidate: ccfg.force_revalidate.unwrap_or(false),
                accept_wildcard_result: ccfg.accept_wildcard_result.unwrap_or(false),
            };
            info!("sanitize game records - started");
            clean::run_cleaning(&mut db, &clean_opts)?;
            info!("sanitize game records - finished");

            let enrich_opts = enrich_options(&loaded_cfg, None);
            info!("backfill player profiles - started");
            rt.block_on(enrich::backfill_user_profiles(&feed, &db, &enrich_opts))?;
            info!("backfill player profiles - finished");

            info!("backfill opening names - started");
            rt.block_on(enrich::backfill_opening_names(&feed, &db, &enrich_opts))?;
            info!("backfill opening names - finished");
        }
        Commands::Export { out } => {
            let db = Db::open_or_create(&cli.db)?;
            export_csv(&db, &out)?;
        }
    }
    Ok(())
}
