// src/config/leaderboard.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::http_csv::MAX_ATTEMPTS;
use crate::ingest::types::Source;

pub const ENV_CONFIG_PATH: &str = "LEADERBOARD_CONFIG_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "LEADERBOARD_POLL_INTERVAL_SECS";

pub const DEFAULT_TOML_PATH: &str = "config/leaderboard.toml";
pub const DEFAULT_JSON_PATH: &str = "config/leaderboard.json";

fn default_poll_interval_secs() -> u64 {
    10
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> u8 {
    1
}
fn default_cache_buster_param() -> String {
    "t".to_string()
}

/// What to do when a payload has data lines but none of them is usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// Publish an empty snapshot, same as any other result.
    #[default]
    AwaitResults,
    /// Treat it as a failed fetch.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Total attempts per fetch (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    #[serde(default = "default_cache_buster_param")]
    pub cache_buster_param: String,
    #[serde(default)]
    pub empty_policy: EmptyPolicy,
    pub sources: Vec<Source>,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            cache_buster_param: default_cache_buster_param(),
            empty_policy: EmptyPolicy::default(),
            sources: builtin_sources(),
        }
    }
}

impl LeaderboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("no sources configured");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be > 0");
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.max_attempts) {
            bail!("max_attempts must be between 1 and {MAX_ATTEMPTS}");
        }
        if self.cache_buster_param.trim().is_empty() {
            bail!("cache_buster_param must not be empty");
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            if s.id.trim().is_empty() {
                bail!("source with empty id (display_name '{}')", s.display_name);
            }
            if !seen.insert(s.id.as_str()) {
                bail!("duplicate source id '{}'", s.id);
            }
            let url = reqwest::Url::parse(&s.endpoint)
                .with_context(|| format!("source '{}': endpoint is not a URL", s.id))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("source '{}': unsupported scheme '{}'", s.id, url.scheme());
            }
        }
        Ok(())
    }
}

/// Load configuration from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<LeaderboardConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading leaderboard config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load configuration using env var + fallbacks:
/// 1) $LEADERBOARD_CONFIG_PATH
/// 2) config/leaderboard.toml
/// 3) config/leaderboard.json
/// 4) built-in sources
pub fn load_config_default() -> Result<LeaderboardConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    for p in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
    }
    let mut cfg = LeaderboardConfig::default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<LeaderboardConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing leaderboard config as JSON");
    }
    match toml::from_str::<LeaderboardConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported leaderboard config format: {toml_err}")),
    }
}

fn apply_env_overrides(cfg: &mut LeaderboardConfig) {
    if let Some(secs) = std::env::var(ENV_POLL_INTERVAL_SECS)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
    {
        cfg.poll_interval_secs = secs;
    }
}

const SHEET_BASE: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTpEsWvBPW5lI63n_e9rLmrW2D9dVEKRAzGZMUu2eZa19Jge0FRWQIomelaLoLRS_gu0RnMscnTRpfg/pub";

/// The school competition feeds the service shipped with.
pub fn builtin_sources() -> Vec<Source> {
    [
        ("ranking1", "ENSINO MÉDIO", "322671126"),
        ("ranking2", "E.I. AO 2°ANO - MANHÃ", "61558089"),
        ("ranking3", "E.I. AO 2°ANO - TARDE", "48058987"),
        ("ranking4", "E.F. I - MANHÃ", "1045355853"),
        ("ranking5", "E.F. I - TARDE", "1874431184"),
        ("ranking6", "E.F. II - MANHÃ", "201984363"),
        ("ranking7", "E.F. II - TARDE", "484061672"),
    ]
    .into_iter()
    .map(|(id, name, gid)| {
        Source::new(
            id,
            name,
            format!("{SHEET_BASE}?gid={gid}&single=true&output=csv"),
        )
    })
    .collect()
}
