use std::time::Duration;

use anyhow::Result;
use chesstv_core::pacing::{Deadline, Pacer};
use games_sqlite::{Db, PlayerProfile};
use tracing::{debug, error, info, warn};
use tv_feed::{FeedClient, UserProfile};

use crate::clean::clean_title;

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    pub time_limit: Duration,
    /// Delay between individual API calls.
    pub throttle: Duration,
    /// Calls before the long cool-off pause.
    pub batch_size: usize,
    pub batch_pause: Duration,
}

/// Flatten the profile JSON into a `players` row.
pub fn player_from_profile(profile: &UserProfile) -> PlayerProfile {
    PlayerProfile {
        player_id: profile.id.clone(),
        username: profile.username.clone(),
        title: clean_title(profile.title.as_deref().unwrap_or("")),
        url: profile.url.clone(),
        real_name: profile.profile.real_name.clone(),
        location: profile.profile.location.clone(),
        bio: profile.profile.bio.clone(),
        rating_fide: profile.profile.fide_rating,
        rating_uscf: profile.profile.uscf_rating,
        rating_bullet: profile.perfs.bullet.as_ref().and_then(|p| p.rating),
        rating_blitz: profile.perfs.blitz.as_ref().and_then(|p| p.rating),
        rating_rapid: profile.perfs.rapid.as_ref().and_then(|p| p.rating),
        rating_classical: profile.perfs.classical.as_ref().and_then(|p| p.rating),
        country_code: profile.profile.flag.clone(),
        created_ms: profile.created_at,
        seen_ms: profile.seen_at,
        playtime_total: profile.play_time.total,
        playtime_tv: profile.play_time.tv,
        games_all: profile.count.all,
        games_rated: profile.count.rated,
        games_won: profile.count.win,
        games_lost: profile.count.loss,
        games_drawn: profile.count.draw,
        patron: profile.patron.unwrap_or(false),
        streaming: profile.streaming.unwrap_or(false),
    }
}

/// Fetch public profiles for every player seen in games that have not been
/// enriched yet. A rate-limit signal aborts the pass; any other per-player
/// failure skips that player.
pub async fn backfill_user_profiles(
    feed: &FeedClient,
    db: &Db,
    opts: &EnrichOptions,
) -> Result<usize> {
    let players = db.unprofiled_players()?;
    if players.is_empty() {
        info!("all profiles up to date, nothing to do");
        return Ok(0);
    }
    info!(players = players.len(), "backfilling player profiles");

    let deadline = Deadline::new(opts.time_limit);
    let pacer = Pacer::new(opts.throttle);
    let mut processed = 0usize;

    for username in &players {
        if deadline.expired() {
            warn!(limit_secs = opts.time_limit.as_secs(), "time limit reached, stopping early");
            break;
        }
        match feed.fetch_user(username).await? {
            Some(profile) if !profile.id.is_empty() => {
                if db.player_exists(&profile.id)? {
                    debug!(%username, "profile already present, skipping insert");
                } else if let Err(err) = db.insert_player(&player_from_profile(&profile)) {
                    error!(%username, error = %err, "profile insert failed");
                    pacer.pause().await;
                    continue;
                }
                db.mark_profile_updated(username)?;
                processed += 1;
            }
            _ => debug!(%username, "no profile data, skipping"),
        }
        if processed > 0 && processed % opts.batch_size == 0 {
            info!(processed, pause_secs = opts.batch_pause.as_secs(), "batch done, cooling off");
            tokio::time::sleep(opts.batch_pause).await;
        }
        pacer.pause().await;
    }

    info!(processed, "player profile backfill finished");
    Ok(processed)
}

/// Fill in opening name and ECO code for games that were ingested without
/// them, from the per-game export endpoint.
pub async fn backfill_opening_names(
    feed: &FeedClient,
    db: &Db,
    opts: &EnrichOptions,
) -> Result<usize> {
    let game_ids = db.games_missing_opening()?;
    if game_ids.is_empty() {
        info!("all opening info up to date, nothing to do");
        return Ok(0);
    }
    info!(games = game_ids.len(), "backfilling opening names");

    let deadline = Deadline::new(opts.time_limit);
    let pacer = Pacer::new(opts.throttle);
    let mut processed = 0usize;

    for game_id in &game_ids {
        if deadline.expired() {
            warn!(limit_secs = opts.time_limit.as_secs(), "time limit reached, stopping early");
            break;
        }
        if let Some(export) = feed.fetch_game_export(game_id).await? {
            match (export.eco, export.opening_name) {
                (Some(eco), Some(name)) => {
                    db.set_opening(game_id, &eco, &name)?;
                    processed += 1;
                }
                _ => debug!(%game_id, "export carries no opening info"),
            }
        }
        if processed > 0 && processed % opts.batch_size == 0 {
            info!(processed, pause_secs = opts.batch_pause.as_secs(), "batch done, cooling off");
            tokio::time::sleep(opts.batch_pause).await;
        }
        pacer.pause().await;
    }

    info!(processed, "opening name backfill finished");
    Ok(processed)
}
