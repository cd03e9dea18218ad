use crate::errors::{AppError, Result};
use crate::models::{OracleRound, PriceSample, Token};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tracing::warn;

/// Target value of a USD stablecoin.
pub const PEG: f64 = 1.0;

/// Chainlink stablecoin feeds heartbeat once a day; two missed beats is stale.
pub const STALE_AFTER_SECS: i64 = 2 * 86_400;

/// An `updated_at` outside the `i64` range counts as stale.
pub fn is_stale(updated_at: u64, now: i64) -> bool {
    match i64::try_from(updated_at) {
        Ok(updated_at) => now.saturating_sub(updated_at) > STALE_AFTER_SECS,
        Err(_) => true,
    }
}

/// Scale a raw aggregator answer by `10^decimals`.
pub fn scale_answer(answer: &BigInt, decimals: u8) -> Option<f64> {
    BigDecimal::new(answer.clone(), i64::from(decimals)).to_f64()
}

/// Turn a raw round into a peg sample stamped with `timestamp`.
pub fn normalize_round(token: Token, round: &OracleRound, timestamp: i64) -> Result<PriceSample> {
    let price = scale_answer(&round.answer, round.decimals).ok_or_else(|| {
        AppError::Other(format!("{token} answer {} does not fit in f64", round.answer))
    })?;
    if !price.is_finite() || price <= 0.0 {
        warn!(%token, price, "[ORACLE] received invalid price");
        return Err(AppError::InvalidPrice {
            token: token.to_string(),
            price,
        });
    }

    if is_stale(round.updated_at, timestamp) {
        warn!(
            %token,
            round_id = round.round_id,
            updated_at = round.updated_at,
            "[ORACLE] feed answer looks stale"
        );
    }

    Ok(PriceSample {
        timestamp,
        token,
        price,
        deviation_from_peg: price - PEG,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(answer: i64, decimals: u8) -> OracleRound {
        OracleRound {
            round_id: 1,
            answer: BigInt::from(answer),
            started_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            answered_in_round: 1,
            decimals,
        }
    }

    #[test]
    fn scales_eight_decimal_answer() {
        let sample = normalize_round(Token::Usdc, &round(99_985_000, 8), 1_700_000_100).unwrap();
        assert!((sample.price - 0.99985).abs() < 1e-12);
        assert!((sample.deviation_from_peg + 0.00015).abs() < 1e-12);
        assert_eq!(sample.timestamp, 1_700_000_100);
        assert_eq!(sample.token, Token::Usdc);
    }

    #[test]
    fn zero_decimals_keeps_integer_answer() {
        assert_eq!(scale_answer(&BigInt::from(2), 0), Some(2.0));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let err = normalize_round(Token::Usdt, &round(0, 8), 1_700_000_000).unwrap_err();
        assert!(matches!(err, AppError::InvalidPrice { .. }));
        let err = normalize_round(Token::Usdt, &round(-5, 8), 1_700_000_000).unwrap_err();
        assert!(matches!(err, AppError::InvalidPrice { .. }));
    }

    #[test]
    fn stale_rounds_are_still_accepted() {
        let sample = normalize_round(Token::Usdt, &round(100_010_000, 8), 1_800_000_000).unwrap();
        assert!((sample.price - 1.0001).abs() < 1e-12);
    }

    #[test]
    fn staleness_uses_checked_conversion() {
        assert!(!is_stale(1_700_000_000, 1_700_000_000 + STALE_AFTER_SECS));
        assert!(is_stale(1_700_000_000, 1_700_000_001 + STALE_AFTER_SECS));
        assert!(is_stale(u64::MAX, 1_700_000_000));
        assert!(!is_stale(i64::MAX as u64, 1_700_000_000));

        let mut r = round(100_000_000, 8);
        r.updated_at = u64::MAX;
        let sample = normalize_round(Token::Usdc, &r, 1_700_000_000).unwrap();
        assert!((sample.price - 1.0).abs() < 1e-12);
    }
}
