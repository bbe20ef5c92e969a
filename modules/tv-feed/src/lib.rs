//! HTTP client for the TV game feed and its sibling endpoints.
//!
//! The client is constructed explicitly and passed in wherever it is needed;
//! there is no process-wide session. A 429 from any endpoint is fatal for the
//! whole run and is surfaced as [`FeedError::RateLimited`] without retrying;
//! other failures are retried a bounded number of times with a fixed delay.

use std::time::Duration;

use pgn_stream::{decode_line, PgnLine};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum FeedError {
    /// Upstream returned 429. Never retried; the caller must stop the run.
    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited,
    #[error("retries exhausted for {what}")]
    Exhausted { what: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry_delay: Duration,
}

impl FeedClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        FeedClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Shrink the fixed retry delay (tests).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url).query(query);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Fetch one snapshot batch for a TV channel. Returns the raw PGN body.
    pub async fn fetch_channel(&self, channel: &str) -> Result<String, FeedError> {
        let url = format!("{}/api/tv/{}", self.base_url, channel);
        for attempt in 1..=MAX_ATTEMPTS {
            let sent = self
                .get(&url, &[("clocks", "false"), ("opening", "true")])
                .send()
                .await;
            match sent {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    return Err(FeedError::RateLimited);
                }
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.text().await?);
                }
                Ok(resp) => warn!(
                    channel,
                    status = %resp.status(),
                    attempt,
                    "channel request failed"
                ),
                Err(err) => warn!(channel, error = %err, attempt, "channel request failed"),
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(FeedError::Exhausted { what: format!("tv channel '{channel}'") })
    }

    /// Fetch a player's public profile. Non-429 HTTP failures are logged and
    /// yield `None` so the enrichment pass can move on to the next player.
    pub async fn fetch_user(&self, username: &str) -> Result<Option<UserProfile>, FeedError> {
        let url = format!("{}/api/user/{}", self.base_url, username);
        let resp = self.get(&url, &[("trophies", "false")]).send().await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }
        if !resp.status().is_success() {
            warn!(username, status = %resp.status(), "profile fetch failed");
            return Ok(None);
        }
        Ok(Some(resp.json::<UserProfile>().await?))
    }

    /// Fetch a single game's export and pull the opening/rating tags out of
    /// its PGN header lines. Non-429 failures yield `None`.
    pub async fn fetch_game_export(&self, game_id: &str) -> Result<Option<GameExport>, FeedError> {
        let url = format!("{}/game/export/{}", self.base_url, game_id);
        let resp = self
            .get(&url, &[("moves", "true"), ("opening", "true")])
            .send()
            .await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }
        if !resp.status().is_success() {
            warn!(game_id, status = %resp.status(), "game export fetch failed");
            return Ok(None);
        }
        let body = resp.text().await?;
        Ok(Some(GameExport::from_pgn(&body)))
    }
}

/// Opening and rating tags extracted from one exported game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameExport {
    pub eco: Option<String>,
    pub opening_name: Option<String>,
    pub white_elo: Option<String>,
    pub black_elo: Option<String>,
}

impl GameExport {
    pub fn from_pgn(body: &str) -> Self {
        let mut export = GameExport::default();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || !line.starts_with('[') {
                continue;
            }
            if let Some(PgnLine::Tag { name, value }) = decode_line(line) {
                match name.as_str() {
                    "eco" => export.eco = Some(value),
                    "opening" => export.opening_name = Some(value),
                    "whiteelo" => export.white_elo = Some(value),
                    "blackelo" => export.black_elo = Some(value),
                    _ => {}
                }
            }
        }
        export
    }
}

/// Public profile JSON as returned by the user endpoint. Everything beyond
/// the id is optional; absent sections deserialize to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub profile: ProfileInfo,
    pub perfs: Perfs,
    pub play_time: PlayTime,
    pub count: GameCounts,
    pub created_at: Option<i64>,
    pub seen_at: Option<i64>,
    pub patron: Option<bool>,
    pub streaming: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileInfo {
    pub real_name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub fide_rating: Option<i64>,
    pub uscf_rating: Option<i64>,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Perfs {
    pub bullet: Option<Perf>,
    pub blitz: Option<Perf>,
    pub rapid: Option<Perf>,
    pub classical: Option<Perf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Perf {
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayTime {
    pub total: Option<i64>,
    pub tv: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameCounts {
    pub all: Option<i64>,
    pub rated: Option<i64>,
    pub win: Option<i64>,
    pub loss: Option<i64>,
    pub draw: Option<i64>,
}
