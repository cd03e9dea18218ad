//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use crate::models::Token;
use crate::scheduler::Schedule;
use std::path::PathBuf;
use url::Url;

/// Chainlink USD aggregators on Ethereum mainnet.
pub const CHAINLINK_FEEDS: &[(Token, &str)] = &[
    (Token::Usdc, "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6"),
    (Token::Usdt, "0x3E7d1eAB13ad0104d2750B8863b489D65364e32D"),
];

pub const DEFAULT_DATABASE_PATH: &str = "data/peg_monitor.db";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_CSV_DIR: &str = "data";
pub const DEFAULT_ROLLING_WINDOW_SECS: i64 = 86_400;
pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 60;

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP JSON-RPC endpoint for Ethereum mainnet. Only the fetching
    /// commands need it.
    pub rpc_url: Option<String>,
    pub database_path: PathBuf,
    pub bind_address: String,
    pub csv_output_dir: PathBuf,
    pub schedule: Schedule,
    /// Lookback of the rolling deviation statistics.
    pub rolling_window_secs: i64,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup("ALCHEMY_RPC_URL")
            .or_else(|| lookup("RPC_URL"))
            .filter(|v| !v.trim().is_empty());
        if let Some(url) = &rpc_url {
            Url::parse(url)?;
        }

        let database_path = lookup("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
        let bind_address =
            lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let csv_output_dir = lookup("CSV_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_DIR));

        let hour = parse_or(&lookup, "SCHEDULE_HOUR", 0u32)?;
        let secs = parse_or(&lookup, "FETCH_INTERVAL_SECS", DEFAULT_FETCH_INTERVAL_SECS)?;
        let schedule = match lookup("SCHEDULE").as_deref().map(str::trim) {
            None | Some("") | Some("daily") => Schedule::daily(hour)?,
            Some("interval") => Schedule::interval(secs)?,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "SCHEDULE must be 'daily' or 'interval', got '{other}'"
                )));
            }
        };

        let rolling_window_secs =
            parse_or(&lookup, "ROLLING_WINDOW_SECS", DEFAULT_ROLLING_WINDOW_SECS)?;
        if rolling_window_secs <= 0 {
            return Err(AppError::Config(
                "ROLLING_WINDOW_SECS must be positive".into(),
            ));
        }

        Ok(Self {
            rpc_url,
            database_path,
            bind_address,
            csv_output_dir,
            schedule,
            rolling_window_secs,
        })
    }

    pub fn rpc_url(&self) -> Result<&str> {
        self.rpc_url.as_deref().ok_or_else(|| {
            AppError::Config("ALCHEMY_RPC_URL not set in environment variables".into())
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        _ => Ok(default),
    }
}
