use super::classify::classify_zscore;
use crate::models::{PriceSample, Token, ZScoreRow};
use std::collections::BTreeMap;

/// Rolling mean / sample stddev / z-score of peg deviation, per token.
///
/// The window for a sample at `t` holds every sample of the same token with
/// `t - window_secs <= ts <= t`, including all samples sharing `t`. Output is
/// ordered by token, then timestamp descending.
pub fn rolling_zscores(samples: &[PriceSample], window_secs: i64) -> Vec<ZScoreRow> {
    let mut by_token: BTreeMap<Token, Vec<&PriceSample>> = BTreeMap::new();
    for s in samples {
        by_token.entry(s.token).or_default().push(s);
    }

    let mut out = Vec::with_capacity(samples.len());
    for series in by_token.values_mut() {
        series.sort_by_key(|s| s.timestamp);
        let mut rows = zscores_for_series(series, window_secs);
        rows.reverse();
        out.extend(rows);
    }
    out
}

fn zscores_for_series(series: &[&PriceSample], window_secs: i64) -> Vec<ZScoreRow> {
    let window_secs = window_secs.max(0);
    let mut rows = Vec::with_capacity(series.len());
    let mut lo = 0usize;
    let mut hi = 0usize;
    for s in series {
        let t = s.timestamp;
        while series[lo].timestamp < t - window_secs {
            lo += 1;
        }
        while hi < series.len() && series[hi].timestamp <= t {
            hi += 1;
        }
        let (mean, stddev) = window_moments(&series[lo..hi]);

        let raw_z = stddev
            .filter(|sd| *sd > 0.0)
            .map(|sd| (s.deviation_from_peg - mean) / sd);

        rows.push(ZScoreRow {
            timestamp: t,
            token: s.token,
            price: s.price,
            deviation_from_peg: s.deviation_from_peg,
            rolling_mean_24h: mean,
            rolling_stddev_24h: stddev,
            zscore: raw_z.unwrap_or(0.0),
            zscore_status: classify_zscore(raw_z),
        });
    }
    rows
}

/// Mean and sample stddev of one window, computed from the window alone.
///
/// Values are shifted by the window's first deviation, so a constant window
/// yields exactly the shared value as mean and exactly zero stddev.
fn window_moments(window: &[&PriceSample]) -> (f64, Option<f64>) {
    let Some(first) = window.first() else {
        return (0.0, None);
    };
    let anchor = first.deviation_from_peg;
    let n = window.len() as f64;
    let mean_shifted = window
        .iter()
        .map(|s| s.deviation_from_peg - anchor)
        .sum::<f64>()
        / n;
    let stddev = (window.len() >= 2).then(|| {
        let ss: f64 = window
            .iter()
            .map(|s| {
                let d = s.deviation_from_peg - anchor - mean_shifted;
                d * d
            })
            .sum();
        (ss / (n - 1.0)).sqrt()
    });
    (anchor + mean_shifted, stddev)
}
