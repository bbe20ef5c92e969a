pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE tv_games (
  game_id          TEXT PRIMARY KEY,
  event_name       TEXT NOT NULL DEFAULT '',
  site_url         TEXT NOT NULL DEFAULT '',
  game_date        TEXT,
  white_id         TEXT NOT NULL DEFAULT '',
  black_id         TEXT NOT NULL DEFAULT '',
  result           TEXT NOT NULL DEFAULT '',
  game_date_utc    TEXT,
  game_time_utc    TEXT,
  white_elo        INTEGER,
  black_elo        INTEGER,
  white_title      TEXT NOT NULL DEFAULT '',
  black_title      TEXT NOT NULL DEFAULT '',
  variant          TEXT NOT NULL DEFAULT '',
  time_control     TEXT NOT NULL DEFAULT '',
  opening_eco_code TEXT,
  termination      TEXT NOT NULL DEFAULT '',
  moves_pgn        TEXT NOT NULL DEFAULT '',
  opening_name     TEXT,
  ingested_at      TEXT NOT NULL,
  validated        INTEGER NOT NULL DEFAULT 0 CHECK (validated IN (0,1)),
  validated_at     TEXT,
  validation_notes TEXT,
  profile_updated  INTEGER NOT NULL DEFAULT 0 CHECK (profile_updated IN (0,1))
);

CREATE TABLE players (
  player_id        TEXT PRIMARY KEY,
  username         TEXT NOT NULL,
  title            TEXT NOT NULL DEFAULT 'None',
  url              TEXT,
  real_name        TEXT,
  location         TEXT,
  bio              TEXT,
  rating_fide      INTEGER,
  rating_uscf      INTEGER,
  rating_bullet    INTEGER,
  rating_blitz     INTEGER,
  rating_rapid     INTEGER,
  rating_classical INTEGER,
  country_code     TEXT,
  created_ms       INTEGER,
  seen_ms          INTEGER,
  playtime_total   INTEGER,
  playtime_tv      INTEGER,
  games_all        INTEGER,
  games_rated      INTEGER,
  games_won        INTEGER,
  games_lost       INTEGER,
  games_drawn      INTEGER,
  patron           INTEGER NOT NULL DEFAULT 0 CHECK (patron IN (0,1)),
  streaming        INTEGER NOT NULL DEFAULT 0 CHECK (streaming IN (0,1))
);

CREATE INDEX idx_tv_games_white ON tv_games(white_id);
CREATE INDEX idx_tv_games_black ON tv_games(black_id);
CREATE INDEX idx_tv_games_validated ON tv_games(validated);
CREATE INDEX idx_tv_games_profile ON tv_games(profile_updated);

COMMIT;
"#;
