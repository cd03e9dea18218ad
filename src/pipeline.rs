//! Fetch → normalize → store → derive statistics, as one job run.

use crate::errors::Result;
use crate::models::{PriceSample, Token};
use crate::oracle::{PriceSource, fetch_all_prices};
use crate::warehouse::Warehouse;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CSV_FILE_NAME: &str = "chainlink_prices.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Success,
    Empty,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub status: LoadStatus,
    pub rows_loaded: usize,
    pub zscore_rows: usize,
    pub total_rows: i64,
    pub distinct_tokens: i64,
    pub samples: Vec<PriceSample>,
}

/// Run the job once at `now` (unix seconds).
pub async fn run_once<S>(
    source: &S,
    warehouse: &Warehouse,
    tokens: &[Token],
    window_secs: i64,
    now: i64,
) -> Result<LoadSummary>
where
    S: PriceSource + ?Sized,
{
    info!("[PIPELINE] starting Chainlink price fetch");
    if tokens.is_empty() {
        warn!("[PIPELINE] no tokens configured, nothing to fetch");
        let (total_rows, distinct_tokens) = warehouse.blocking(|wh| wh.counts()).await?;
        return Ok(LoadSummary {
            status: LoadStatus::Empty,
            rows_loaded: 0,
            zscore_rows: 0,
            total_rows,
            distinct_tokens,
            samples: Vec::new(),
        });
    }

    let samples = fetch_all_prices(source, tokens, now).await?;
    let (rows_loaded, zscore_rows, (total_rows, distinct_tokens), samples) = warehouse
        .blocking(move |wh| {
            let rows_loaded = wh.insert_prices(&samples)?;
            let zscore_rows = wh.refresh_zscores(window_secs)?;
            Ok((rows_loaded, zscore_rows, wh.counts()?, samples))
        })
        .await?;

    info!(
        rows_loaded,
        zscore_rows, total_rows, distinct_tokens, "[PIPELINE] run complete"
    );

    Ok(LoadSummary {
        status: LoadStatus::Success,
        rows_loaded,
        zscore_rows,
        total_rows,
        distinct_tokens,
        samples,
    })
}

/// Write samples to `dir/chainlink_prices.csv`, replacing any previous file.
pub fn write_csv(samples: &[PriceSample], dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(CSV_FILE_NAME);
    let mut file = fs::File::create(&path)?;
    writeln!(file, "timestamp,token_symbol,price,deviation_from_peg")?;
    for s in samples {
        writeln!(
            file,
            "{},{},{},{}",
            s.timestamp, s.token, s.price, s.deviation_from_peg
        )?;
    }
    info!(path = %path.display(), rows = samples.len(), "[PIPELINE] saved CSV");
    Ok(path)
}
