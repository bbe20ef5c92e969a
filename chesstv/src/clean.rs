use anyhow::Result;
use games_sqlite::{Db, GameRecord, ValidationUpdate};
use tracing::{debug, error, info};

pub const VALID_RESULTS: [&str; 3] = ["1-0", "0-1", "1/2-1/2"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Re-check rows that already passed validation.
    pub force_revalidate: bool,
    /// Whether the in-progress marker `*` counts as a valid result. Off by
    /// default: an ingested snapshot that never finished gets dropped.
    pub accept_wildcard_result: bool,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub updated: usize,
    pub deleted: usize,
}

/// What the cleaning pass decided for one row.
#[derive(Debug)]
pub enum Disposition {
    Delete(String),
    Normalize(ValidationUpdate),
}

/// Title strings arrive as "GM", "gm", "None", "unranked", or empty.
/// Collapse the no-title spellings and uppercase the rest.
pub fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || matches!(trimmed.to_ascii_lowercase().as_str(), "none" | "unranked") {
        "None".to_string()
    } else {
        trimmed.to_ascii_uppercase()
    }
}

/// Map free-form termination strings onto the canonical set. Anything
/// unrecognized (including "Unterminated") is treated as a normal finish.
pub fn canonical_termination(raw: &str) -> &'static str {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TIME_FORFEIT" | "TIME FORFEIT" => "TIME_FORFEIT",
        "RESIGNED" => "RESIGNED",
        "ABANDONED" => "ABANDONED",
        _ => "NORMAL",
    }
}

pub fn assess_game(rec: &GameRecord, accept_wildcard: bool) -> Disposition {
    let required = [
        ("white_id", &rec.white_id),
        ("black_id", &rec.black_id),
        ("moves_pgn", &rec.moves_pgn),
        ("result", &rec.result),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Disposition::Delete(format!("Missing field: {field}"));
        }
    }
    let result_ok = VALID_RESULTS.contains(&rec.result.as_str())
        || (accept_wildcard && rec.result == "*");
    if !result_ok {
        return Disposition::Delete(format!("Invalid result: {}", rec.result));
    }

    let mut notes: Vec<String> = Vec::new();

    let eco = if rec.opening_eco_code.trim() == "?" {
        notes.push("Cleared unknown ECO code".to_string());
        None
    } else {
        Some(rec.opening_eco_code.clone())
    };

    let termination = canonical_termination(&rec.termination);
    if termination != rec.termination {
        notes.push(format!("Normalized termination: {} -> {}", rec.termination, termination));
    }

    Disposition::Normalize(ValidationUpdate {
        game_id: rec.game_id.clone(),
        white_title: clean_title(&rec.white_title),
        black_title: clean_title(&rec.black_title),
        opening_eco_code: eco,
        termination: termination.to_string(),
        notes: if notes.is_empty() { "Valid".to_string() } else { notes.join(", ") },
    })
}

/// Validate and normalize every pending row. A failure on one row is logged
/// and costs only that row.
pub fn run_cleaning(db: &mut Db, opts: &CleanOptions) -> Result<CleanReport> {
    let rows = db.games_to_validate(opts.force_revalidate)?;
    info!(rows = rows.len(), "validating rows");

    let mut report = CleanReport::default();
    for (idx, rec) in rows.iter().enumerate() {
        match assess_game(rec, opts.accept_wildcard_result) {
            Disposition::Delete(reason) => match db.delete_game(&rec.game_id) {
                Ok(()) => {
                    debug!(game_id = %rec.game_id, %reason, "deleted invalid row");
                    report.deleted += 1;
                }
                Err(err) => error!(game_id = %rec.game_id, error = %err, "delete failed"),
            },
            Disposition::Normalize(update) => match db.apply_validation(&update) {
                Ok(()) => report.updated += 1,
                Err(err) => error!(game_id = %rec.game_id, error = %err, "validation update failed"),
            },
        }
        if (idx + 1) % 30 == 0 {
            info!(processed = idx + 1, total = rows.len(), "cleaning progress");
        }
    }

    info!(updated = report.updated, deleted = report.deleted, "cleaning done");
    Ok(report)
}
