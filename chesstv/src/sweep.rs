use std::time::Duration;

use chesstv_core::pacing::Deadline;
use games_sqlite::{Db, GameRecord, UpsertOutcome};
use pgn_stream::{split_batch, PgnGame};
use tracing::{debug, error, info, warn};
use tv_feed::{FeedClient, FeedError};

/// Ids touched during one sweep, kept separately so the per-batch log line
/// can say what was new and what was a re-poll of a live game.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub failed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.added.len() + self.updated.len()
    }
}

/// Split one response body into game blocks and upsert each one. A write
/// failure only costs that game; the rest of the batch continues.
pub fn ingest_batch(db: &mut Db, body: &str, report: &mut SweepReport) {
    for block in split_batch(body) {
        let game = PgnGame::from_lines(&block);
        let Some(record) = GameRecord::from_pgn(&game) else {
            debug!("block without a usable site header, skipped");
            continue;
        };
        match db.upsert_game(&record) {
            Ok(UpsertOutcome::Inserted) => report.added.push(record.game_id),
            Ok(UpsertOutcome::Updated) => report.updated.push(record.game_id),
            Err(err) => {
                error!(game_id = %record.game_id, error = %err, "upsert failed");
                report.failed += 1;
            }
        }
    }
}

/// Sweep every configured channel once, in order. A rate-limit signal from
/// any channel aborts the whole sweep immediately; other fetch failures skip
/// just that channel.
pub async fn sweep_channels(
    feed: &FeedClient,
    db: &mut Db,
    channels: &[String],
) -> Result<SweepReport, FeedError> {
    let mut report = SweepReport::default();
    for channel in channels {
        info!(channel = %channel, "fetching channel");
        let body = match feed.fetch_channel(channel).await {
            Ok(body) => body,
            Err(FeedError::RateLimited) => return Err(FeedError::RateLimited),
            Err(err) => {
                warn!(channel = %channel, error = %err, "skipping channel this sweep");
                continue;
            }
        };
        let before = (report.added.len(), report.updated.len());
        ingest_batch(db, &body, &mut report);
        info!(
            channel = %channel,
            added = report.added.len() - before.0,
            updated = report.updated.len() - before.1,
            "channel swept"
        );
    }
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub channels: Vec<String>,
    pub time_limit: Duration,
    pub sleep_interval: Duration,
    pub rate_limit_pause: Duration,
    pub max_games: usize,
}

/// Repeat full sweeps until the time budget runs out. After `max_games`
/// upserts in one session, pause for the long cool-off and reset the count.
pub async fn run_ingestion(feed: &FeedClient, db: &mut Db, opts: &IngestOptions) -> anyhow::Result<()> {
    let deadline = Deadline::new(opts.time_limit);
    let mut session_total = 0usize;
    loop {
        let report = sweep_channels(feed, db, &opts.channels).await?;
        info!(
            added = report.added.len(),
            updated = report.updated.len(),
            failed = report.failed,
            "sweep done"
        );
        session_total += report.total();

        if session_total >= opts.max_games {
            info!(
                total = session_total,
                pause_secs = opts.rate_limit_pause.as_secs(),
                "game threshold reached, cooling off"
            );
            tokio::time::sleep(opts.rate_limit_pause).await;
            session_total = 0;
        }
        if deadline.expired() {
            info!(elapsed_secs = deadline.elapsed().as_secs(), "time limit reached, stopping ingestion");
            return Ok(());
        }
        debug!(secs = opts.sleep_interval.as_secs(), "sleeping before next sweep");
        tokio::time::sleep(opts.sleep_interval).await;
    }
}
