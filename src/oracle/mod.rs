//! Chainlink price-feed integration.

use crate::errors::{AppError, Result};
use crate::models::{OracleRound, PriceSample, Token};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

pub mod client;
pub mod normalize;

pub use client::OracleClient;
pub use normalize::{PEG, normalize_round};

/// Anything that can hand back the latest oracle round for a token.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_round(&self, token: Token) -> Result<OracleRound>;
}

/// Fetch and normalize every token, skipping the ones that fail.
///
/// All samples share `timestamp`. Fails only when no token produced a price.
pub async fn fetch_all_prices<S>(
    source: &S,
    tokens: &[Token],
    timestamp: i64,
) -> Result<Vec<PriceSample>>
where
    S: PriceSource + ?Sized,
{
    info!(tokens = tokens.len(), "[ORACLE] fetching prices");
    let rounds = join_all(tokens.iter().map(|t| source.fetch_round(*t))).await;

    let mut samples = Vec::with_capacity(tokens.len());
    for (token, round) in tokens.iter().zip(rounds) {
        match round.and_then(|r| normalize_round(*token, &r, timestamp)) {
            Ok(sample) => {
                info!(
                    %token,
                    price = %format!("{:.6}", sample.price),
                    deviation_pct = %format!("{:.4}", sample.deviation_from_peg * 100.0),
                    "[ORACLE] price fetched"
                );
                samples.push(sample);
            }
            Err(e) => warn!(%token, error = %e, "[ORACLE] failed to fetch price data"),
        }
    }

    if samples.is_empty() {
        return Err(AppError::NoData(
            "Failed to fetch price data for any token".into(),
        ));
    }
    samples.sort_by_key(|s| s.token.symbol());
    Ok(samples)
}
