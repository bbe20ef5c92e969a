use crate::models::{date_to_sql, time_to_sql, timestamp_to_sql};
use crate::{Db, GameRecord};
use anyhow::Result;
use rusqlite::params;
use tracing::debug;

/// Which action an upsert performed. A failed write is neither: the error
/// propagates and the caller does not count the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl Db {
    /// Insert the record, or overwrite every column of the existing row with
    /// the same id. One transaction per call; on error the transaction is
    /// rolled back and nothing is written.
    ///
    /// Re-polling a live game hands us the same id with progressively more
    /// complete data; last write wins, no merging.
    pub fn upsert_game(&mut self, game: &GameRecord) -> Result<UpsertOutcome> {
        let tx = self.conn.transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT COUNT(1) FROM tv_games WHERE game_id = ?",
            [&game.game_id],
            |r| r.get(0),
        )?;
        let outcome = if exists > 0 {
            tx.execute(
                "UPDATE tv_games SET
                   event_name=?, site_url=?, game_date=?, white_id=?, black_id=?, result=?,
                   game_date_utc=?, game_time_utc=?, white_elo=?, black_elo=?,
                   white_title=?, black_title=?, variant=?, time_control=?,
                   opening_eco_code=?, termination=?, moves_pgn=?, opening_name=?, ingested_at=?
                 WHERE game_id=?",
                params![
                    game.event_name,
                    game.site_url,
                    date_to_sql(game.game_date),
                    game.white_id,
                    game.black_id,
                    game.result,
                    date_to_sql(game.game_date_utc),
                    time_to_sql(game.game_time_utc),
                    game.white_elo,
                    game.black_elo,
                    game.white_title,
                    game.black_title,
                    game.variant,
                    game.time_control,
                    game.opening_eco_code,
                    game.termination,
                    game.moves_pgn,
                    game.opening_name,
                    timestamp_to_sql(game.ingested_at),
                    game.game_id,
                ],
            )?;
            UpsertOutcome::Updated
        } else {
            tx.execute(
                "INSERT INTO tv_games (
                   game_id, event_name, site_url, game_date, white_id, black_id, result,
                   game_date_utc, game_time_utc, white_elo, black_elo,
                   white_title, black_title, variant, time_control,
                   opening_eco_code, termination, moves_pgn, opening_name, ingested_at
                 ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
                params![
                    game.game_id,
                    game.event_name,
                    game.site_url,
                    date_to_sql(game.game_date),
                    game.white_id,
                    game.black_id,
                    game.result,
                    date_to_sql(game.game_date_utc),
                    time_to_sql(game.game_time_utc),
                    game.white_elo,
                    game.black_elo,
                    game.white_title,
                    game.black_title,
                    game.variant,
                    game.time_control,
                    game.opening_eco_code,
                    game.termination,
                    game.moves_pgn,
                    game.opening_name,
                    timestamp_to_sql(game.ingested_at),
                ],
            )?;
            UpsertOutcome::Inserted
        };
        tx.commit()?;
        debug!(game_id = %game.game_id, ?outcome, "upserted game");
        Ok(outcome)
    }
}
