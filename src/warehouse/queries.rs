//! Reads and writes against the warehouse tables.

use super::Warehouse;
use crate::errors::Result;
use crate::models::{PegHealthRow, PegStatus, PriceSample, Token, ZScoreRow, ZScoreStatus};
use crate::oracle::PEG;
use crate::stats::rolling_zscores;
use rusqlite::{OptionalExtension, Row, params, types::Type};
use tracing::{debug, info};

/// Dashboard default for the peg-health series.
pub const PEG_HEALTH_LIMIT: usize = 1000;
/// Dashboard default for the z-score series.
pub const ZSCORE_LIMIT: usize = 5000;

impl Warehouse {
    /// Append samples to `chainlink_prices` in one transaction.
    pub fn insert_prices(&self, samples: &[PriceSample]) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO chainlink_prices (timestamp, token, price, deviation_from_1)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for s in samples {
                    stmt.execute(params![
                        s.timestamp,
                        s.token.symbol(),
                        s.price,
                        s.deviation_from_peg
                    ])?;
                }
            }
            tx.commit()?;
            debug!(rows = samples.len(), "[WAREHOUSE] inserted prices");
            Ok(samples.len())
        })
    }

    /// Every stored sample of a known token, oldest first.
    pub fn all_samples(&self) -> Result<Vec<PriceSample>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, token, price FROM chainlink_prices
                 ORDER BY token, timestamp, id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (timestamp, token, price) = row?;
                let Some(token) = known_token(&token) else {
                    continue;
                };
                out.push(PriceSample {
                    timestamp,
                    token,
                    price,
                    deviation_from_peg: price - PEG,
                });
            }
            Ok(out)
        })
    }

    /// Rebuild `stablecoin_peg_zscore` from every stored price.
    pub fn refresh_zscores(&self, window_secs: i64) -> Result<usize> {
        let samples = self.all_samples()?;
        let rows = rolling_zscores(&samples, window_secs);
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM stablecoin_peg_zscore", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO stablecoin_peg_zscore
                       (timestamp, token, price, deviation_from_peg, rolling_mean_24h,
                        rolling_stddev_24h, zscore, zscore_status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for r in &rows {
                    stmt.execute(params![
                        r.timestamp,
                        r.token.symbol(),
                        r.price,
                        r.deviation_from_peg,
                        r.rolling_mean_24h,
                        r.rolling_stddev_24h,
                        r.zscore,
                        r.zscore_status.as_str(),
                    ])?;
                }
            }
            tx.commit()?;
            info!(rows = rows.len(), window_secs, "[WAREHOUSE] z-score table refreshed");
            Ok(rows.len())
        })
    }

    /// Most recent `limit` peg-health rows, returned oldest first.
    pub fn peg_health(&self, token: Option<Token>, limit: usize) -> Result<Vec<PegHealthRow>> {
        let mut rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, token, price, deviation_from_peg, abs_deviation_from_peg,
                        deviation_from_peg_pct, peg_status, loaded_at
                 FROM stablecoin_peg_health
                 WHERE ?1 IS NULL OR token = ?1
                 ORDER BY timestamp DESC, token
                 LIMIT ?2",
            )?;
            let mapped = stmt.query_map(
                params![token.map(|t| t.symbol()), limit as i64],
                peg_health_from_row,
            )?;
            collect_known(mapped)
        })?;
        rows.reverse();
        Ok(rows)
    }

    /// Latest peg-health row per token.
    pub fn latest_peg_health(&self) -> Result<Vec<PegHealthRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, token, price, deviation_from_peg, abs_deviation_from_peg,
                        deviation_from_peg_pct, peg_status, loaded_at
                 FROM stablecoin_peg_health
                 WHERE token = ?1
                 ORDER BY timestamp DESC
                 LIMIT 1",
            )?;
            let mut out = Vec::new();
            for token in Token::all() {
                let row = stmt
                    .query_row([token.symbol()], peg_health_from_row)
                    .optional()?;
                if let Some(Some(row)) = row {
                    out.push(row);
                }
            }
            Ok(out)
        })
    }

    /// Most recent `limit` z-score rows, newest first.
    pub fn zscores(&self, token: Option<Token>, limit: usize) -> Result<Vec<ZScoreRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, token, price, deviation_from_peg, rolling_mean_24h,
                        rolling_stddev_24h, zscore, zscore_status
                 FROM stablecoin_peg_zscore
                 WHERE ?1 IS NULL OR token = ?1
                 ORDER BY timestamp DESC, token
                 LIMIT ?2",
            )?;
            let mapped = stmt.query_map(
                params![token.map(|t| t.symbol()), limit as i64],
                zscore_from_row,
            )?;
            collect_known(mapped)
        })
    }

    /// `(total price rows, distinct tokens)`.
    pub fn counts(&self) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT token) FROM chainlink_prices",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?)
        })
    }
}

/// Rows for tokens this build does not track (e.g. DAI) map to `None`.
fn known_token(raw: &str) -> Option<Token> {
    match raw.parse() {
        Ok(t) => Some(t),
        Err(_) => {
            debug!(token = raw, "[WAREHOUSE] skipping row for untracked token");
            None
        }
    }
}

fn collect_known<T, I>(rows: I) -> Result<Vec<T>>
where
    I: Iterator<Item = rusqlite::Result<Option<T>>>,
{
    let mut out = Vec::new();
    for row in rows {
        if let Some(v) = row? {
            out.push(v);
        }
    }
    Ok(out)
}

fn bad_text(idx: usize, e: crate::errors::AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
}

fn peg_health_from_row(row: &Row<'_>) -> rusqlite::Result<Option<PegHealthRow>> {
    let token: String = row.get(1)?;
    let Some(token) = known_token(&token) else {
        return Ok(None);
    };
    let status: String = row.get(6)?;
    let peg_status: PegStatus = status.parse().map_err(|e| bad_text(6, e))?;
    Ok(Some(PegHealthRow {
        timestamp: row.get(0)?,
        token,
        price: row.get(2)?,
        deviation_from_peg: row.get(3)?,
        abs_deviation_from_peg: row.get(4)?,
        deviation_from_peg_pct: row.get(5)?,
        peg_status,
        loaded_at: row.get(7)?,
    }))
}

fn zscore_from_row(row: &Row<'_>) -> rusqlite::Result<Option<ZScoreRow>> {
    let token: String = row.get(1)?;
    let Some(token) = known_token(&token) else {
        return Ok(None);
    };
    let status: String = row.get(7)?;
    let zscore_status: ZScoreStatus = status.parse().map_err(|e| bad_text(7, e))?;
    Ok(Some(ZScoreRow {
        timestamp: row.get(0)?,
        token,
        price: row.get(2)?,
        deviation_from_peg: row.get(3)?,
        rolling_mean_24h: row.get(4)?,
        rolling_stddev_24h: row.get(5)?,
        zscore: row.get(6)?,
        zscore_status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::classify_peg;

    fn sample(token: Token, ts: i64, price: f64) -> PriceSample {
        PriceSample {
            timestamp: ts,
            token,
            price,
            deviation_from_peg: price - 1.0,
        }
    }

    fn seeded() -> Warehouse {
        let wh = Warehouse::open_memory().expect("open");
        let mut samples = Vec::new();
        for i in 0..10 {
            samples.push(sample(Token::Usdc, 1_700_000_000 + i * 60, 1.0 + 0.0001 * i as f64));
            samples.push(sample(Token::Usdt, 1_700_000_000 + i * 60, 1.0 - 0.0002 * i as f64));
        }
        wh.insert_prices(&samples).expect("insert");
        wh
    }

    #[test]
    fn insert_and_count() {
        let wh = seeded();
        assert_eq!(wh.counts().unwrap(), (20, 2));
    }

    #[test]
    fn view_status_matches_classifier() {
        let wh = Warehouse::open_memory().unwrap();
        let prices = [1.0, 0.9995, 1.0011, 0.996, 1.005, 1.0061, 0.9];
        let samples: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| sample(Token::Usdc, i as i64, *p))
            .collect();
        wh.insert_prices(&samples).unwrap();
        let rows = wh.peg_health(Some(Token::Usdc), PEG_HEALTH_LIMIT).unwrap();
        assert_eq!(rows.len(), prices.len());
        for row in rows {
            assert_eq!(row.peg_status, classify_peg(row.price - 1.0), "price {}", row.price);
            assert!((row.deviation_from_peg_pct - row.deviation_from_peg * 100.0).abs() < 1e-9);
            assert!(row.loaded_at.is_some());
        }
        let statuses: Vec<_> = wh
            .peg_health(None, 3)
            .unwrap()
            .into_iter()
            .map(|r| r.peg_status)
            .collect();
        assert_eq!(
            statuses,
            vec![PegStatus::Warning, PegStatus::Critical, PegStatus::Critical]
        );
    }

    #[test]
    fn peg_health_is_filtered_limited_and_ascending() {
        let wh = seeded();
        let rows = wh.peg_health(Some(Token::Usdt), 4).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.token == Token::Usdt));
        assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(rows.last().unwrap().timestamp, 1_700_000_000 + 9 * 60);
    }

    #[test]
    fn untracked_tokens_are_ignored() {
        let wh = seeded();
        wh.with_conn(|c| {
            c.execute(
                "INSERT INTO chainlink_prices (timestamp, token, price, deviation_from_1)
                 VALUES (1800000000, 'DAI', 0.98, -0.02)",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let rows = wh.peg_health(None, PEG_HEALTH_LIMIT).unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(wh.all_samples().unwrap().len(), 20);
        assert_eq!(wh.latest_peg_health().unwrap().len(), 2);
    }

    #[test]
    fn latest_peg_health_has_one_row_per_token() {
        let wh = seeded();
        let latest = wh.latest_peg_health().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].token, Token::Usdc);
        assert_eq!(latest[1].token, Token::Usdt);
        assert!(latest.iter().all(|r| r.timestamp == 1_700_000_000 + 9 * 60));
    }

    #[test]
    fn refresh_replaces_zscore_table() {
        let wh = seeded();
        assert_eq!(wh.refresh_zscores(86_400).unwrap(), 20);
        assert_eq!(wh.refresh_zscores(86_400).unwrap(), 20);
        let rows = wh.zscores(None, ZSCORE_LIMIT).unwrap();
        assert_eq!(rows.len(), 20);
        assert!(rows.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let oldest_usdc = wh
            .zscores(Some(Token::Usdc), ZSCORE_LIMIT)
            .unwrap()
            .pop()
            .unwrap();
        assert_eq!(oldest_usdc.rolling_stddev_24h, None);
        assert_eq!(oldest_usdc.zscore_status, ZScoreStatus::Normal);
    }

    #[test]
    fn zscores_match_in_memory_computation() {
        let wh = seeded();
        wh.refresh_zscores(300).unwrap();
        let expected = rolling_zscores(&wh.all_samples().unwrap(), 300);
        let stored = wh.zscores(Some(Token::Usdt), 1).unwrap();
        let want = expected
            .iter()
            .find(|r| r.token == Token::Usdt && r.timestamp == stored[0].timestamp)
            .unwrap();
        assert!((stored[0].zscore - want.zscore).abs() < 1e-12);
        assert_eq!(stored[0].zscore_status, want.zscore_status);
    }

    #[test]
    fn empty_warehouse_reads_cleanly() {
        let wh = Warehouse::open_memory().unwrap();
        assert_eq!(wh.counts().unwrap(), (0, 0));
        assert!(wh.peg_health(None, 10).unwrap().is_empty());
        assert!(wh.latest_peg_health().unwrap().is_empty());
        assert_eq!(wh.refresh_zscores(86_400).unwrap(), 0);
    }
}
