use crate::models::{PriceSample, ZScoreRow, ZScoreStatus};
use serde::Serialize;

/// Aggregate view of one fetch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchSummary {
    pub count: usize,
    pub mean_price: f64,
    pub mean_deviation: f64,
    pub max_abs_deviation: f64,
}

pub fn summarize(samples: &[PriceSample]) -> Option<FetchSummary> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    Some(FetchSummary {
        count: samples.len(),
        mean_price: samples.iter().map(|s| s.price).sum::<f64>() / n,
        mean_deviation: samples.iter().map(|s| s.deviation_from_peg).sum::<f64>() / n,
        max_abs_deviation: samples
            .iter()
            .map(|s| s.deviation_from_peg.abs())
            .fold(0.0, f64::max),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over `[min, max]`; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Count of rows per z-score status, every status included.
pub fn status_counts(rows: &[ZScoreRow]) -> Vec<(ZScoreStatus, usize)> {
    ZScoreStatus::all()
        .iter()
        .map(|status| {
            (
                *status,
                rows.iter().filter(|r| r.zscore_status == *status).count(),
            )
        })
        .collect()
}
