use std::{env, fs, path::Path};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram application credentials (https://my.telegram.org)
    pub api_id: i32,
    pub api_hash: String,

    /// Connection attempts before the handshake gives up on the transport.
    pub connection_retries: u32,

    /// Emit presentation events as JSON lines instead of human text.
    pub events_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_id = lookup("TELEGRAM_API_ID")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_API_ID environment variable is required".to_string())
            })?;
        let api_id = api_id.trim().parse::<i32>().map_err(|_| {
            Error::Config(format!("TELEGRAM_API_ID must be an integer, got {api_id:?}"))
        })?;

        let api_hash = lookup("TELEGRAM_API_HASH")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_API_HASH environment variable is required".to_string())
            })?;

        let connection_retries = lookup("TELEGRAM_CONNECTION_RETRIES")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(5)
            .max(1);

        let events_json = lookup("MGP_EVENTS_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            api_id,
            api_hash: api_hash.trim().to_string(),
            connection_retries,
            events_json,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
