use crate::config::CHAINLINK_FEEDS;
use crate::errors::{AppError, Result};
use crate::models::{OracleRound, Token};
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Middleware, Provider},
    types::{Address, I256, U256},
};
use num_bigint::BigInt;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use super::PriceSource;

abigen!(
    ChainlinkAggregator,
    r"[
        function latestRoundData() view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound)
        function decimals() view returns (uint8)
    ]",
);

/// Handle for reading the configured Chainlink USD aggregators.
#[derive(Clone)]
pub struct OracleClient {
    feeds: HashMap<Token, ChainlinkAggregator<Provider<Http>>>,
}

impl OracleClient {
    /// Connect to `rpc_url` and check the endpoint answers `eth_blockNumber`.
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        info!("[ORACLE] connecting to RPC endpoint");
        let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);
        let block = provider
            .get_block_number()
            .await
            .map_err(|e| AppError::Connection(format!("Error connecting to RPC: {e}")))?;
        info!(block = block.as_u64(), "[ORACLE] connected to Ethereum mainnet");

        let mut feeds = HashMap::new();
        for (token, raw) in CHAINLINK_FEEDS {
            let address = parse_feed_address(raw)?;
            feeds.insert(*token, ChainlinkAggregator::new(address, provider.clone()));
        }
        Ok(Self { feeds })
    }

    fn feed(&self, token: Token) -> Result<&ChainlinkAggregator<Provider<Http>>> {
        self.feeds
            .get(&token)
            .ok_or_else(|| AppError::Config(format!("No feed address configured for {token}")))
    }
}

#[async_trait]
impl PriceSource for OracleClient {
    async fn fetch_round(&self, token: Token) -> Result<OracleRound> {
        let feed = self.feed(token)?;
        debug!(%token, address = ?feed.address(), "[ORACLE] reading feed");
        let decimals = feed.decimals().call().await?;
        let (round_id, answer, started_at, updated_at, answered_in_round) =
            feed.latest_round_data().call().await?;
        Ok(OracleRound {
            round_id,
            answer: i256_to_bigint(answer)?,
            started_at: u256_to_u64(started_at, "startedAt")?,
            updated_at: u256_to_u64(updated_at, "updatedAt")?,
            answered_in_round,
            decimals,
        })
    }
}

fn parse_feed_address(raw: &str) -> Result<Address> {
    raw.parse::<Address>()
        .map_err(|e| AppError::Config(format!("invalid feed address {raw}: {e}")))
}

fn u256_to_u64(value: U256, field: &str) -> Result<u64> {
    if value.bits() > 64 {
        return Err(AppError::Other(format!("{field} {value} does not fit in u64")));
    }
    Ok(value.low_u64())
}

fn i256_to_bigint(value: I256) -> Result<BigInt> {
    BigInt::from_str(&value.to_string())
        .map_err(|e| AppError::Other(format!("cannot convert answer {value}: {e}")))
}
