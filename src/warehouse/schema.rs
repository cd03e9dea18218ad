//! SQL schema definitions.

/// Raw oracle samples, the peg-health view over them, and the materialized
/// rolling z-score table.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS chainlink_prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    token TEXT NOT NULL,
    price REAL NOT NULL,
    deviation_from_1 REAL NOT NULL,
    loaded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_prices_token_ts ON chainlink_prices(token, timestamp);

CREATE VIEW IF NOT EXISTS stablecoin_peg_health AS
SELECT
    timestamp,
    token,
    price,
    price - 1.0 AS deviation_from_peg,
    ABS(price - 1.0) AS abs_deviation_from_peg,
    (price - 1.0) * 100 AS deviation_from_peg_pct,
    CASE
        WHEN ABS(price - 1.0) <= 0.001 THEN 'healthy'
        WHEN ABS(price - 1.0) <= 0.005 THEN 'warning'
        ELSE 'critical'
    END AS peg_status,
    loaded_at
FROM chainlink_prices;

CREATE TABLE IF NOT EXISTS stablecoin_peg_zscore (
    timestamp INTEGER NOT NULL,
    token TEXT NOT NULL,
    price REAL NOT NULL,
    deviation_from_peg REAL NOT NULL,
    rolling_mean_24h REAL NOT NULL,
    rolling_stddev_24h REAL,
    zscore REAL NOT NULL,
    zscore_status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_zscore_token_ts ON stablecoin_peg_zscore(token, timestamp);
"#;

/// Tables and views [`SCHEMA_V1`] creates.
pub const OBJECTS: &[(&str, &str)] = &[
    ("table", "chainlink_prices"),
    ("view", "stablecoin_peg_health"),
    ("table", "stablecoin_peg_zscore"),
];
