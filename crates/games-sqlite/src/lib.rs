mod models;
mod query;
mod schema;
mod upsert;

pub use models::*;
pub use query::*;
pub use upsert::*;

use crate::schema::MIG_0001_INIT;
use anyhow::Result;
use rusqlite::Connection;

pub struct Db {
    pub conn: Connection,
}

impl Db {
    pub fn open_or_create(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        migrate(&conn)?;
        Ok(Db { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Db { conn })
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<()> {
    // naive: if the games table doesn't exist, apply 0001
    let exists: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='tv_games'",
        [],
        |r| r.get(0),
    )?;
    if exists == 0 {
        conn.execute_batch(MIG_0001_INIT)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::GameRecord;
    use time::macros::{date, datetime, time};

    pub fn sample_game(game_id: &str) -> GameRecord {
        GameRecord {
            game_id: game_id.to_string(),
            event_name: "Rated blitz game".into(),
            site_url: format!("https://example.org/{game_id}"),
            game_date: Some(date!(2025 - 01 - 01)),
            white_id: "player1".into(),
            black_id: "player2".into(),
            result: "1-0".into(),
            game_date_utc: Some(date!(2025 - 01 - 01)),
            game_time_utc: Some(time!(12:00:00)),
            white_elo: Some(2100),
            black_elo: Some(2200),
            white_title: "GM".into(),
            black_title: "IM".into(),
            variant: "Standard".into(),
            time_control: "600+0".into(),
            opening_eco_code: "C20".into(),
            termination: "Normal".into(),
            moves_pgn: "1. e4 e5".into(),
            opening_name: "King's Pawn Game".into(),
            ingested_at: datetime!(2025-01-01 12:00:00 UTC),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_applies_schema() {
        let db = Db::open_in_memory().unwrap();
        assert!(db.table_exists("tv_games").unwrap());
        assert!(db.table_exists("players").unwrap());
    }

    #[test]
    fn migrate_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        migrate(&db.conn).unwrap();
        assert!(db.table_exists("tv_games").unwrap());
    }

    #[test]
    fn reopening_a_file_backed_db_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.db");
        {
            let mut db = Db::open_or_create(&path).unwrap();
            db.upsert_game(&testutil::sample_game("abc123")).unwrap();
        }
        let db = Db::open_or_create(&path).unwrap();
        assert!(db.get_game("abc123").unwrap().is_some());
    }
}
