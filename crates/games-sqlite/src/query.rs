use crate::models::{
    date_from_sql, now_rfc3339, time_from_sql, timestamp_from_sql, PlayerProfile,
};
use crate::{Db, GameRecord};
use anyhow::Result;
use rusqlite::{params, Row};
use std::collections::BTreeSet;

const GAME_COLUMNS: &str = "game_id, event_name, site_url, game_date, white_id, black_id, result, \
     game_date_utc, game_time_utc, white_elo, black_elo, white_title, black_title, \
     variant, time_control, opening_eco_code, termination, moves_pgn, opening_name, ingested_at";

/// Normalized fields written back by the cleaning pass, plus its audit trail.
#[derive(Debug, Clone)]
pub struct ValidationUpdate {
    pub game_id: String,
    pub white_title: String,
    pub black_title: String,
    pub opening_eco_code: Option<String>,
    pub termination: String,
    pub notes: String,
}

fn game_from_row(row: &Row) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        game_id: row.get("game_id")?,
        event_name: row.get("event_name")?,
        site_url: row.get("site_url")?,
        game_date: date_from_sql(row.get("game_date")?),
        white_id: row.get("white_id")?,
        black_id: row.get("black_id")?,
        result: row.get("result")?,
        game_date_utc: date_from_sql(row.get("game_date_utc")?),
        game_time_utc: time_from_sql(row.get("game_time_utc")?),
        white_elo: row.get("white_elo")?,
        black_elo: row.get("black_elo")?,
        white_title: row.get("white_title")?,
        black_title: row.get("black_title")?,
        variant: row.get("variant")?,
        time_control: row.get("time_control")?,
        opening_eco_code: row.get::<_, Option<String>>("opening_eco_code")?.unwrap_or_default(),
        termination: row.get("termination")?,
        moves_pgn: row.get("moves_pgn")?,
        opening_name: row.get::<_, Option<String>>("opening_name")?.unwrap_or_default(),
        ingested_at: timestamp_from_sql(&row.get::<_, String>("ingested_at")?),
    })
}

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn get_game(&self, game_id: &str) -> Result<Option<GameRecord>> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM tv_games WHERE game_id = ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([game_id], game_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn count_games(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(1) FROM tv_games", [], |r| r.get(0))?)
    }

    pub fn all_games(&self) -> Result<Vec<GameRecord>> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM tv_games ORDER BY game_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], game_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rows the cleaning pass should look at: never validated, or carrying a
    /// field the pass normalizes. `force` re-checks everything.
    pub fn games_to_validate(&self, force: bool) -> Result<Vec<GameRecord>> {
        let sql = format!(
            "SELECT {GAME_COLUMNS} FROM tv_games
             WHERE ?1 = 1 OR validated = 0 OR opening_eco_code = '?'
                OR termination NOT IN ('NORMAL','TIME_FORFEIT','RESIGNED','ABANDONED')
             ORDER BY game_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([force as i64], game_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_game(&self, game_id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM tv_games WHERE game_id = ?", [game_id])?;
        Ok(())
    }

    pub fn apply_validation(&self, update: &ValidationUpdate) -> Result<()> {
        self.conn.execute(
            "UPDATE tv_games SET
               white_title=?, black_title=?, opening_eco_code=?, termination=?,
               validated=1, validated_at=?, validation_notes=?
             WHERE game_id=?",
            params![
                update.white_title,
                update.black_title,
                update.opening_eco_code,
                update.termination,
                now_rfc3339(),
                update.notes,
                update.game_id,
            ],
        )?;
        Ok(())
    }

    /// Distinct player ids appearing in games not yet profile-enriched.
    pub fn unprofiled_players(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT white_id, black_id FROM tv_games WHERE profile_updated = 0",
        )?;
        let mut players = BTreeSet::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for idx in 0..2 {
                let id: String = row.get(idx)?;
                if !id.is_empty() {
                    players.insert(id);
                }
            }
        }
        Ok(players.into_iter().collect())
    }

    pub fn player_exists(&self, player_id: &str) -> Result<bool> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM players WHERE player_id = ?",
            [player_id],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn insert_player(&self, profile: &PlayerProfile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO players (
               player_id, username, title, url, real_name, location, bio,
               rating_fide, rating_uscf, rating_bullet, rating_blitz, rating_rapid,
               rating_classical, country_code, created_ms, seen_ms,
               playtime_total, playtime_tv, games_all, games_rated,
               games_won, games_lost, games_drawn, patron, streaming
             ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
            params![
                profile.player_id,
                profile.username,
                profile.title,
                profile.url,
                profile.real_name,
                profile.location,
                profile.bio,
                profile.rating_fide,
                profile.rating_uscf,
                profile.rating_bullet,
                profile.rating_blitz,
                profile.rating_rapid,
                profile.rating_classical,
                profile.country_code,
                profile.created_ms,
                profile.seen_ms,
                profile.playtime_total,
                profile.playtime_tv,
                profile.games_all,
                profile.games_rated,
                profile.games_won,
                profile.games_lost,
                profile.games_drawn,
                profile.patron as i64,
                profile.streaming as i64,
            ],
        )?;
        Ok(())
    }

    /// Flip the enrichment flag on every game the player appears in.
    pub fn mark_profile_updated(&self, username: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE tv_games SET profile_updated = 1 WHERE white_id = ? OR black_id = ?",
            params![username, username],
        )?;
        Ok(())
    }

    /// Game ids whose opening name or ECO code is still unknown.
    pub fn games_missing_opening(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id FROM tv_games
             WHERE opening_name IS NULL OR opening_name IN ('', '?')
                OR opening_eco_code IS NULL OR opening_eco_code IN ('', '?')
             ORDER BY game_id",
        )?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_opening(&self, game_id: &str, eco: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE tv_games SET opening_eco_code = ?, opening_name = ? WHERE game_id = ?",
            params![eco, name, game_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_game;

    #[test]
    fn validation_queue_shrinks_after_apply() {
        let mut db = Db::open_in_memory().unwrap();
        db.upsert_game(&sample_game("abc123")).unwrap();
        db.upsert_game(&sample_game("def456")).unwrap();
        assert_eq!(db.games_to_validate(false).unwrap().len(), 2);

        db.apply_validation(&ValidationUpdate {
            game_id: "abc123".into(),
            white_title: "None".into(),
            black_title: "None".into(),
            opening_eco_code: Some("C20".into()),
            termination: "NORMAL".into(),
            notes: "Valid".into(),
        })
        .unwrap();

        let pending = db.games_to_validate(false).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].game_id, "def456");

        // force re-checks validated rows too
        assert_eq!(db.games_to_validate(true).unwrap().len(), 2);
    }

    #[test]
    fn delete_game_removes_the_row() {
        let mut db = Db::open_in_memory().unwrap();
        db.upsert_game(&sample_game("abc123")).unwrap();
        db.delete_game("abc123").unwrap();
        assert!(db.get_game("abc123").unwrap().is_none());
    }

    #[test]
    fn unprofiled_players_are_distinct_and_cleared_by_marking() {
        let mut db = Db::open_in_memory().unwrap();
        let mut a = sample_game("abc123");
        a.white_id = "alice".into();
        a.black_id = "bob".into();
        let mut b = sample_game("def456");
        b.white_id = "bob".into();
        b.black_id = "carol".into();
        db.upsert_game(&a).unwrap();
        db.upsert_game(&b).unwrap();

        assert_eq!(db.unprofiled_players().unwrap(), vec!["alice", "bob", "carol"]);

        db.mark_profile_updated("alice").unwrap();
        // bob still appears via the second game
        assert_eq!(db.unprofiled_players().unwrap(), vec!["bob", "carol"]);
    }

    #[test]
    fn player_insert_then_exists() {
        let db = Db::open_in_memory().unwrap();
        let profile = PlayerProfile {
            player_id: "alice".into(),
            username: "Alice".into(),
            title: "GM".into(),
            rating_blitz: Some(2700),
            patron: true,
            ..Default::default()
        };
        assert!(!db.player_exists("alice").unwrap());
        db.insert_player(&profile).unwrap();
        assert!(db.player_exists("alice").unwrap());
    }

    #[test]
    fn missing_opening_queue_and_set_opening() {
        let mut db = Db::open_in_memory().unwrap();
        let mut unknown = sample_game("abc123");
        unknown.opening_eco_code = "?".into();
        unknown.opening_name = String::new();
        let mut known = sample_game("def456");
        known.opening_eco_code = "C20".into();
        known.opening_name = "King's Pawn Game".into();
        db.upsert_game(&unknown).unwrap();
        db.upsert_game(&known).unwrap();

        assert_eq!(db.games_missing_opening().unwrap(), vec!["abc123"]);

        db.set_opening("abc123", "B01", "Scandinavian Defense").unwrap();
        assert!(db.games_missing_opening().unwrap().is_empty());
        let stored = db.get_game("abc123").unwrap().unwrap();
        assert_eq!(stored.opening_eco_code, "B01");
        assert_eq!(stored.opening_name, "Scandinavian Defense");
    }
}
