use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CHANNELS: [&str; 5] = ["bullet", "blitz", "classical", "rapid", "ultraBullet"];
pub const DEFAULT_BASE_URL: &str = "https://lichess.org";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct IngestConfig {
    pub time_limit_secs: Option<u64>,
    pub sleep_interval_secs: Option<u64>,
    pub rate_limit_pause_secs: Option<u64>,
    pub max_games: Option<usize>,
    pub channels: Option<Vec<String>>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct CleanConfig {
    pub force_revalidate: Option<bool>,
    pub accept_wildcard_result: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct EnrichConfig {
    pub time_limit_secs: Option<u64>,
    pub throttle_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_pause_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub ingest: Option<IngestConfig>,
    pub clean: Option<CleanConfig>,
    pub enrich: Option<EnrichConfig>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("chesstv.yaml");
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = fs::read_to_string(path).ok()?;
    serde_yaml::from_str(&s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_yaml() {
        let cfg: Config = serde_yaml::from_str(
            "ingest:\n  time_limit_secs: 120\n  channels: [bullet, blitz]\nclean:\n  accept_wildcard_result: true\n",
        )
        .unwrap();
        let ingest = cfg.ingest.unwrap();
        assert_eq!(ingest.time_limit_secs, Some(120));
        assert_eq!(ingest.channels.as_deref(), Some(&["bullet".to_string(), "blitz".to_string()][..]));
        assert_eq!(ingest.max_games, None);
        assert_eq!(cfg.clean.unwrap().accept_wildcard_result, Some(true));
        assert!(cfg.enrich.is_none());
    }
}
