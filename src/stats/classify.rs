use crate::models::{PegStatus, ZScoreStatus};

/// |deviation| at or below this is a healthy peg.
pub const PEG_HEALTHY_BAND: f64 = 0.001;
/// |deviation| at or below this (and above healthy) is a warning.
pub const PEG_WARNING_BAND: f64 = 0.005;

/// |z| strictly above this is unusual.
pub const ZSCORE_UNUSUAL: f64 = 1.0;
/// |z| strictly above this is an outlier.
pub const ZSCORE_OUTLIER: f64 = 2.0;

pub fn classify_peg(deviation: f64) -> PegStatus {
    let abs = deviation.abs();
    if abs <= PEG_HEALTHY_BAND {
        PegStatus::Healthy
    } else if abs <= PEG_WARNING_BAND {
        PegStatus::Warning
    } else {
        PegStatus::Critical
    }
}

/// `zscore` is `None` when the window's standard deviation is undefined or zero.
pub fn classify_zscore(zscore: Option<f64>) -> ZScoreStatus {
    match zscore.map(f64::abs) {
        Some(z) if z > ZSCORE_OUTLIER => ZScoreStatus::Outlier,
        Some(z) if z > ZSCORE_UNUSUAL => ZScoreStatus::Unusual,
        _ => ZScoreStatus::Normal,
    }
}
