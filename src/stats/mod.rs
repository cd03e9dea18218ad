//! Peg-deviation statistics: threshold classification and rolling z-scores.

pub mod classify;
pub mod rolling;
pub mod summary;

pub use classify::{classify_peg, classify_zscore};
pub use rolling::rolling_zscores;
pub use summary::{FetchSummary, HistogramBin, histogram, status_counts, summarize};
