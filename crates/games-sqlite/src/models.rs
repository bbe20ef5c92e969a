use pgn_stream::PgnGame;
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};
use tracing::debug;

const PGN_DATE: &[FormatItem<'static>] = format_description!("[year].[month].[day]");
const CLOCK_TIME: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const SQL_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// One game row, keyed by `game_id`. Every write is a full-record replace;
/// there is no partial-update path for these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub game_id: String,
    pub event_name: String,
    pub site_url: String,
    pub game_date: Option<Date>,
    pub white_id: String,
    pub black_id: String,
    pub result: String,
    pub game_date_utc: Option<Date>,
    pub game_time_utc: Option<Time>,
    pub white_elo: Option<i64>,
    pub black_elo: Option<i64>,
    pub white_title: String,
    pub black_title: String,
    pub variant: String,
    pub time_control: String,
    pub opening_eco_code: String,
    pub termination: String,
    pub moves_pgn: String,
    pub opening_name: String,
    pub ingested_at: OffsetDateTime,
}

impl GameRecord {
    /// Build a record from one decoded game block. Returns `None` when the
    /// `site` header is absent or yields no id; that is the only hard
    /// precondition. Every other field falls back to empty/NULL on bad input.
    pub fn from_pgn(game: &PgnGame) -> Option<GameRecord> {
        let site = game.header("site")?;
        let game_id = site.rsplit('/').next().unwrap_or_default().to_string();
        if game_id.is_empty() {
            debug!(site, "site header has no usable game id, skipping block");
            return None;
        }
        let text = |name: &str| game.header(name).unwrap_or_default().to_string();
        Some(GameRecord {
            game_id,
            event_name: text("event"),
            site_url: site.to_string(),
            game_date: parse_game_date(game.header("date")),
            white_id: text("white"),
            black_id: text("black"),
            result: text("result"),
            game_date_utc: parse_game_date(game.header("utcdate")),
            game_time_utc: parse_game_time(game.header("utctime")),
            white_elo: parse_rating(game.header("whiteelo")),
            black_elo: parse_rating(game.header("blackelo")),
            white_title: text("whitetitle"),
            black_title: text("blacktitle"),
            variant: text("variant"),
            time_control: text("timecontrol"),
            opening_eco_code: text("eco"),
            termination: text("termination"),
            moves_pgn: game.moves().to_string(),
            opening_name: text("opening"),
            ingested_at: OffsetDateTime::now_utc(),
        })
    }
}

/// One enriched player row for the `players` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProfile {
    pub player_id: String,
    pub username: String,
    pub title: String,
    pub url: Option<String>,
    pub real_name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub rating_fide: Option<i64>,
    pub rating_uscf: Option<i64>,
    pub rating_bullet: Option<i64>,
    pub rating_blitz: Option<i64>,
    pub rating_rapid: Option<i64>,
    pub rating_classical: Option<i64>,
    pub country_code: Option<String>,
    pub created_ms: Option<i64>,
    pub seen_ms: Option<i64>,
    pub playtime_total: Option<i64>,
    pub playtime_tv: Option<i64>,
    pub games_all: Option<i64>,
    pub games_rated: Option<i64>,
    pub games_won: Option<i64>,
    pub games_lost: Option<i64>,
    pub games_drawn: Option<i64>,
    pub patron: bool,
    pub streaming: bool,
}

/// Coerce a rating header to an integer; anything non-numeric becomes NULL.
pub fn parse_rating(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<i64>().ok()
}

/// Coerce a `YYYY.MM.DD` header to a date; format or calendar violations
/// become NULL.
pub fn parse_game_date(value: Option<&str>) -> Option<Date> {
    Date::parse(value?.trim(), &PGN_DATE).ok()
}

/// Coerce an `HH:MM:SS` header to a time-of-day; invalid input becomes NULL.
pub fn parse_game_time(value: Option<&str>) -> Option<Time> {
    Time::parse(value?.trim(), &CLOCK_TIME).ok()
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

pub(crate) fn date_to_sql(date: Option<Date>) -> Option<String> {
    date.and_then(|d| d.format(&SQL_DATE).ok())
}

pub(crate) fn date_from_sql(text: Option<String>) -> Option<Date> {
    text.and_then(|s| Date::parse(&s, &SQL_DATE).ok())
}

pub(crate) fn time_to_sql(time: Option<Time>) -> Option<String> {
    time.and_then(|t| t.format(&CLOCK_TIME).ok())
}

pub(crate) fn time_from_sql(text: Option<String>) -> Option<Time> {
    text.and_then(|s| Time::parse(&s, &CLOCK_TIME).ok())
}

pub(crate) fn timestamp_to_sql(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

pub(crate) fn timestamp_from_sql(text: &str) -> OffsetDateTime {
    OffsetDateTime::parse(text, &Rfc3339).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    #[test]
    fn rating_coercion_nulls_on_bad_input() {
        assert_eq!(parse_rating(Some("?")), None);
        assert_eq!(parse_rating(Some("")), None);
        assert_eq!(parse_rating(None), None);
        assert_eq!(parse_rating(Some("2100")), Some(2100));
    }

    #[test]
    fn date_coercion_rejects_invalid_calendar_dates() {
        assert_eq!(parse_game_date(Some("2025.13.99")), None);
        assert_eq!(parse_game_date(Some("not a date")), None);
        assert_eq!(parse_game_date(None), None);
        assert_eq!(parse_game_date(Some("2025.01.31")), Some(date!(2025 - 01 - 31)));
    }

    #[test]
    fn time_coercion_rejects_invalid_input() {
        assert_eq!(parse_game_time(Some("25:00:00")), None);
        assert_eq!(parse_game_time(Some("")), None);
        assert_eq!(parse_game_time(Some("12:34:56")), Some(time!(12:34:56)));
    }

    #[test]
    fn builds_record_from_full_header_set() {
        let game = PgnGame::from_lines([
            r#"[Event "Casual bullet game"]"#,
            r#"[Site "https://example.org/abc123"]"#,
            r#"[Date "2025.01.01"]"#,
            r#"[White "player1"]"#,
            r#"[Black "player2"]"#,
            r#"[Result "1-0"]"#,
            r#"[UTCDate "2025.01.01"]"#,
            r#"[UTCTime "12:00:00"]"#,
            r#"[WhiteElo "2100"]"#,
            r#"[BlackElo "2200"]"#,
            r#"[WhiteTitle "GM"]"#,
            r#"[Variant "Standard"]"#,
            r#"[TimeControl "600+0"]"#,
            r#"[ECO "C20"]"#,
            r#"[Termination "Normal"]"#,
            "1. e4 e5",
        ]);
        let rec = GameRecord::from_pgn(&game).unwrap();
        assert_eq!(rec.game_id, "abc123");
        assert_eq!(rec.event_name, "Casual bullet game");
        assert_eq!(rec.site_url, "https://example.org/abc123");
        assert_eq!(rec.game_date, Some(date!(2025 - 01 - 01)));
        assert_eq!(rec.game_time_utc, Some(time!(12:00:00)));
        assert_eq!(rec.white_elo, Some(2100));
        assert_eq!(rec.black_elo, Some(2200));
        assert_eq!(rec.white_title, "GM");
        assert_eq!(rec.black_title, "");
        assert_eq!(rec.termination, "Normal");
        assert_eq!(rec.moves_pgn, "1. e4 e5");
    }

    #[test]
    fn missing_site_yields_no_record() {
        let game = PgnGame::from_lines([r#"[Event "E"]"#, "1. e4 e5"]);
        assert!(GameRecord::from_pgn(&game).is_none());
    }

    #[test]
    fn site_without_id_segment_yields_no_record() {
        let game = PgnGame::from_lines([r#"[Site "https://example.org/"]"#, "1. e4 e5"]);
        assert!(GameRecord::from_pgn(&game).is_none());
    }

    #[test]
    fn bad_elo_does_not_drop_the_game() {
        let game = PgnGame::from_lines([
            r#"[Site "https://example.org/xyz789"]"#,
            r#"[WhiteElo "?"]"#,
            "1. d4 d5",
        ]);
        let rec = GameRecord::from_pgn(&game).unwrap();
        assert_eq!(rec.white_elo, None);
        assert_eq!(rec.moves_pgn, "1. d4 d5");
    }
}
