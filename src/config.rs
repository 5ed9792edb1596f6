use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

const SETTINGS_FILE: &str = "settings.json";

/// Dashboard-editable settings. Connection details and credentials always come from the
/// environment so a fresh login is never shadowed by a saved cookie.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SavedSettings {
    pub balance_poll_secs: Option<u64>,
    pub contract_reload_delay_ms: Option<u64>,
}

impl SavedSettings {
    pub fn load() -> Self {
        let path = Path::new(SETTINGS_FILE);
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    match serde_json::from_str(&contents) {
                        Ok(s) => return s,
                        Err(e) => tracing::warn!("failed to parse {SETTINGS_FILE}: {e}"),
                    }
                }
                Err(e) => tracing::warn!("failed to read {SETTINGS_FILE}: {e}"),
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(SETTINGS_FILE, json) {
                    tracing::warn!("failed to write {SETTINGS_FILE}: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {e}"),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            balance_poll_secs: Some(config.balance_poll_secs),
            contract_reload_delay_ms: Some(config.contract_reload_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub api_base: String,
    #[serde(skip)]
    pub session_id: String,
    #[serde(skip)]
    pub csrf_token: String,

    pub countdown_tick_ms: u64,
    pub balance_poll_secs: u64,
    pub contract_reload_delay_ms: u64,
    pub request_timeout_secs: u64,

    pub store_path: String,
    pub log_level: String,
    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let saved = SavedSettings::load();

        Ok(Self {
            api_base: env_or("FARM_API_BASE", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            session_id: env_or("FARM_SESSION_ID", ""),
            csrf_token: env_or("FARM_CSRF_TOKEN", ""),

            countdown_tick_ms: parse_env("COUNTDOWN_TICK_MS", "1000")?,
            balance_poll_secs: match saved.balance_poll_secs {
                Some(v) => v,
                None => parse_env("BALANCE_POLL_SECS", "5")?,
            },
            contract_reload_delay_ms: match saved.contract_reload_delay_ms {
                Some(v) => v,
                None => parse_env("CONTRACT_RELOAD_DELAY_MS", "500")?,
            },
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", "10")?,

            store_path: env_or("STORE_PATH", "farm-sync.db"),
            log_level: env_or("LOG_LEVEL", "info"),
            http_port: parse_env("HTTP_PORT", "3000")?,
        })
    }

    pub fn persist(&self) {
        SavedSettings::from_config(self).save();
    }

    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env_or(key, default);
    raw.parse::<T>().with_context(|| format!("invalid value for {key}: {raw}"))
}
