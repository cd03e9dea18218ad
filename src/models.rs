//! Shared data structures used throughout the application.

use crate::errors::{AppError, Result};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stablecoins tracked against the $1.00 peg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Token {
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    Usdt,
}

impl Token {
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Usdc => "USDC",
            Token::Usdt => "USDT",
        }
    }

    pub fn all() -> &'static [Token] {
        &[Token::Usdc, Token::Usdt]
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Token {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USDC" => Ok(Token::Usdc),
            "USDT" => Ok(Token::Usdt),
            other => Err(AppError::InvalidInput(format!("unknown token '{other}'"))),
        }
    }
}

/// Raw `latestRoundData` answer plus the feed's `decimals`.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRound {
    pub round_id: u128,
    /// Signed price scaled by `10^decimals`.
    pub answer: BigInt,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u128,
    pub decimals: u8,
}

/// One normalized oracle observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Unix seconds (UTC) at which the sample was taken.
    pub timestamp: i64,
    pub token: Token,
    pub price: f64,
    pub deviation_from_peg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PegStatus {
    Healthy,
    Warning,
    Critical,
}

impl PegStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PegStatus::Healthy => "healthy",
            PegStatus::Warning => "warning",
            PegStatus::Critical => "critical",
        }
    }
}

impl FromStr for PegStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "healthy" => Ok(PegStatus::Healthy),
            "warning" => Ok(PegStatus::Warning),
            "critical" => Ok(PegStatus::Critical),
            other => Err(AppError::Other(format!("unknown peg status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZScoreStatus {
    Normal,
    Unusual,
    Outlier,
}

impl ZScoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZScoreStatus::Normal => "normal",
            ZScoreStatus::Unusual => "unusual",
            ZScoreStatus::Outlier => "outlier",
        }
    }

    pub fn all() -> &'static [ZScoreStatus] {
        &[ZScoreStatus::Normal, ZScoreStatus::Unusual, ZScoreStatus::Outlier]
    }
}

impl FromStr for ZScoreStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(ZScoreStatus::Normal),
            "unusual" => Ok(ZScoreStatus::Unusual),
            "outlier" => Ok(ZScoreStatus::Outlier),
            other => Err(AppError::Other(format!("unknown z-score status '{other}'"))),
        }
    }
}

/// Row of the `stablecoin_peg_health` view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PegHealthRow {
    pub timestamp: i64,
    pub token: Token,
    pub price: f64,
    pub deviation_from_peg: f64,
    pub abs_deviation_from_peg: f64,
    pub deviation_from_peg_pct: f64,
    pub peg_status: PegStatus,
    pub loaded_at: Option<String>,
}

/// Row of the `stablecoin_peg_zscore` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZScoreRow {
    pub timestamp: i64,
    pub token: Token,
    pub price: f64,
    pub deviation_from_peg: f64,
    pub rolling_mean_24h: f64,
    /// `None` while the window holds fewer than two samples.
    pub rolling_stddev_24h: Option<f64>,
    pub zscore: f64,
    pub zscore_status: ZScoreStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_parses_case_insensitively() {
        assert_eq!("usdc".parse::<Token>().unwrap(), Token::Usdc);
        assert_eq!(" USDT ".parse::<Token>().unwrap(), Token::Usdt);
        assert!("DAI".parse::<Token>().is_err());
    }

    #[test]
    fn token_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&Token::Usdt).unwrap(), "\"USDT\"");
    }

    #[test]
    fn statuses_round_trip_through_str() {
        for s in ZScoreStatus::all() {
            assert_eq!(s.as_str().parse::<ZScoreStatus>().unwrap(), *s);
        }
        assert_eq!("warning".parse::<PegStatus>().unwrap(), PegStatus::Warning);
    }
}
