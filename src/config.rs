use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::analytics::drawdown::{DrawdownType, PropFirmRules};
use crate::models::Session;

/// A session window on the US/Eastern clock, as (hour, minute) pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTime {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    File,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Backend
    pub backend: BackendKind,
    pub journal_dir: PathBuf,
    pub api_base_url: String,
    pub api_timeout_secs: u64,

    // Account / prop-firm rules
    pub account_size: f64,
    pub daily_drawdown_pct: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_type: DrawdownType,

    // Sessions (ET clock)
    pub sessions: HashMap<Session, SessionTime>,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let backend = match env("JOURNAL_BACKEND", "file").to_lowercase().as_str() {
            "http" => BackendKind::Http,
            _ => BackendKind::File,
        };

        let max_drawdown_type = match env("MAX_DD_TYPE", "static").to_lowercase().as_str() {
            "trailing" => DrawdownType::Trailing,
            _ => DrawdownType::Static,
        };

        Config {
            backend,
            journal_dir: PathBuf::from(env("JOURNAL_DIR", "journal")),
            api_base_url: env("JOURNAL_API_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            api_timeout_secs: env("JOURNAL_API_TIMEOUT_SECS", "10").parse().unwrap_or(10),
            account_size: env("ACCOUNT_SIZE", "5000").parse().unwrap_or(5000.0),
            daily_drawdown_pct: env("DAILY_DD_PERCENT", "4").parse().unwrap_or(4.0),
            max_drawdown_pct: env("MAX_DD_PERCENT", "8").parse().unwrap_or(8.0),
            max_drawdown_type,
            sessions: default_sessions(),
            log_level: env("LOG_LEVEL", "info"),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn prop_firm_rules(&self) -> PropFirmRules {
        PropFirmRules {
            account_size: self.account_size,
            daily_drawdown_pct: self.daily_drawdown_pct,
            max_drawdown_pct: self.max_drawdown_pct,
            max_drawdown_type: self.max_drawdown_type,
        }
    }
}

pub fn default_sessions() -> HashMap<Session, SessionTime> {
    let mut sessions = HashMap::new();
    sessions.insert(
        Session::Asian,
        SessionTime {
            start: (20, 0),
            end: (0, 0),
        },
    );
    sessions.insert(
        Session::London,
        SessionTime {
            start: (2, 0),
            end: (5, 0),
        },
    );
    sessions.insert(
        Session::NewYork,
        SessionTime {
            start: (7, 0),
            end: (10, 0),
        },
    );
    sessions
}
