use super::{AppState, page};
use crate::errors::{AppError, Result};
use crate::models::{PegHealthRow, Token, ZScoreRow, ZScoreStatus};
use crate::stats::{HistogramBin, histogram, status_counts};
use crate::warehouse::queries::{PEG_HEALTH_LIMIT, ZSCORE_LIMIT};
use axum::{
    Json,
    extract::{Query, State},
    response::Html,
};
use serde::{Deserialize, Serialize};

/// Rows shown in the recent-activity table on `/`.
const PAGE_RECENT_ROWS: usize = 20;
const DEFAULT_BINS: usize = 30;
const MAX_BINS: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct SeriesQuery {
    /// `USDC`, `USDT` or `All` (the default).
    pub token: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DistributionQuery {
    pub token: Option<String>,
    pub bins: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub total_rows: i64,
    pub distinct_tokens: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: ZScoreStatus,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    pub token: Option<Token>,
    pub total: usize,
    pub bins: Vec<HistogramBin>,
    pub status_counts: Vec<StatusCount>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let (total_rows, distinct_tokens) = state.warehouse.blocking(|wh| wh.counts()).await?;
    Ok(Json(HealthResponse {
        status: "ok",
        total_rows,
        distinct_tokens,
    }))
}

/// GET /api/peg-health?token=&limit=
pub async fn peg_health(
    State(state): State<AppState>,
    Query(q): Query<SeriesQuery>,
) -> Result<Json<Vec<PegHealthRow>>> {
    let token = parse_token(q.token.as_deref())?;
    let limit = parse_limit(q.limit, PEG_HEALTH_LIMIT)?;
    let rows = state.warehouse.blocking(move |wh| wh.peg_health(token, limit)).await?;
    Ok(Json(rows))
}

/// GET /api/peg-health/latest?token=
pub async fn latest_peg_health(
    State(state): State<AppState>,
    Query(q): Query<SeriesQuery>,
) -> Result<Json<Vec<PegHealthRow>>> {
    let token = parse_token(q.token.as_deref())?;
    let mut rows = state.warehouse.blocking(|wh| wh.latest_peg_health()).await?;
    if let Some(token) = token {
        rows.retain(|r| r.token == token);
    }
    Ok(Json(rows))
}

/// GET /api/zscore?token=&limit=
pub async fn zscores(
    State(state): State<AppState>,
    Query(q): Query<SeriesQuery>,
) -> Result<Json<Vec<ZScoreRow>>> {
    let token = parse_token(q.token.as_deref())?;
    let limit = parse_limit(q.limit, ZSCORE_LIMIT)?;
    let rows = state.warehouse.blocking(move |wh| wh.zscores(token, limit)).await?;
    Ok(Json(rows))
}

/// GET /api/zscore/distribution?token=&bins=
pub async fn zscore_distribution(
    State(state): State<AppState>,
    Query(q): Query<DistributionQuery>,
) -> Result<Json<DistributionResponse>> {
    let token = parse_token(q.token.as_deref())?;
    let bins = q.bins.unwrap_or(DEFAULT_BINS);
    if bins == 0 || bins > MAX_BINS {
        return Err(AppError::InvalidInput(format!(
            "bins must be between 1 and {MAX_BINS}"
        )));
    }

    let rows = state.warehouse.blocking(move |wh| wh.zscores(token, ZSCORE_LIMIT)).await?;
    let values: Vec<f64> = rows.iter().map(|r| r.zscore).collect();
    Ok(Json(DistributionResponse {
        token,
        total: rows.len(),
        bins: histogram(&values, bins),
        status_counts: status_counts(&rows)
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
    }))
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    let (latest, recent, counts) = state.warehouse.blocking(|wh| {
        Ok((
            wh.latest_peg_health()?,
            wh.zscores(None, PAGE_RECENT_ROWS)?,
            wh.counts()?,
        ))
    })
    .await?;
    Ok(Html(page::render(&latest, &recent, counts)))
}

/// `None` and `All` select every token.
fn parse_token(raw: Option<&str>) -> Result<Option<Token>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

fn parse_limit(raw: Option<usize>, default: usize) -> Result<usize> {
    match raw {
        None => Ok(default),
        Some(0) => Err(AppError::InvalidInput("limit must be positive".into())),
        Some(n) => Ok(n.min(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::*;
    use crate::models::PriceSample;
    use crate::warehouse::Warehouse;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn state_with_data() -> AppState {
        let warehouse = Warehouse::open_memory().unwrap();
        let mut samples = Vec::new();
        for i in 0..6 {
            let usdc = 1.0 + if i == 5 { 0.003 } else { 0.0001 * i as f64 };
            let usdt = 1.0 - 0.0001 * i as f64;
            for (token, price) in [(Token::Usdc, usdc), (Token::Usdt, usdt)] {
                samples.push(PriceSample {
                    timestamp: 1_700_000_000 + i * 3600,
                    token,
                    price,
                    deviation_from_peg: price - 1.0,
                });
            }
        }
        warehouse.insert_prices(&samples).unwrap();
        warehouse.refresh_zscores(86_400).unwrap();
        AppState { warehouse }
    }

    /// More rows than either endpoint's cap.
    fn state_with_long_history() -> AppState {
        let warehouse = Warehouse::open_memory().unwrap();
        let samples: Vec<_> = (0..(ZSCORE_LIMIT as i64 + 100))
            .map(|i| PriceSample {
                timestamp: 1_700_000_000 + i * 60,
                token: Token::Usdc,
                price: 1.0 + 0.00001 * (i % 7) as f64,
                deviation_from_peg: 0.00001 * (i % 7) as f64,
            })
            .collect();
        warehouse.insert_prices(&samples).unwrap();
        warehouse.refresh_zscores(600).unwrap();
        AppState { warehouse }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let (status, body) = get(state_with_data(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["total_rows"], 12);
        assert_eq!(body["distinct_tokens"], 2);
    }

    #[tokio::test]
    async fn peg_health_filters_by_token() {
        let (status, body) = get(state_with_data(), "/api/peg-health?token=usdc").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r["token"] == "USDC"));
        assert_eq!(rows.last().unwrap()["peg_status"], "warning");
    }

    #[tokio::test]
    async fn all_token_returns_everything() {
        let (_, body) = get(state_with_data(), "/api/peg-health?token=All&limit=5").await;
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unknown_token_is_bad_request() {
        let (status, body) = get(state_with_data(), "/api/zscore?token=DAI").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn latest_has_one_row_per_token() {
        let (_, body) = get(state_with_data(), "/api/peg-health/latest").await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        let (_, body) = get(state_with_data(), "/api/peg-health/latest?token=USDT").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zscores_are_newest_first() {
        let (_, body) = get(state_with_data(), "/api/zscore?token=USDC").await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["timestamp"], 1_700_000_000 + 5 * 3600);
        assert!(rows[5]["rolling_stddev_24h"].is_null());
    }

    #[tokio::test]
    async fn distribution_counts_every_row() {
        let (status, body) =
            get(state_with_data(), "/api/zscore/distribution?token=USDC&bins=4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 6);
        let bins = body["bins"].as_array().unwrap();
        assert_eq!(bins.len(), 4);
        let binned: u64 = bins.iter().map(|b| b["count"].as_u64().unwrap()).sum();
        assert_eq!(binned, 6);
        let counted: u64 = body["status_counts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["count"].as_u64().unwrap())
            .sum();
        assert_eq!(counted, 6);
    }

    #[tokio::test]
    async fn zero_bins_is_rejected() {
        let (status, _) = get(state_with_data(), "/api/zscore/distribution?bins=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_renders_html() {
        let resp = router(state_with_data())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("USDC"));
        assert!(html.contains("warning"));
    }

    #[test]
    fn token_param_parsing() {
        assert_eq!(parse_token(None).unwrap(), None);
        assert_eq!(parse_token(Some("ALL")).unwrap(), None);
        assert_eq!(parse_token(Some("usdt")).unwrap(), Some(Token::Usdt));
        assert!(parse_token(Some("DAI")).is_err());
    }

    #[tokio::test]
    async fn limit_above_cap_is_clamped() {
        let state = state_with_long_history();
        let (status, body) = get(state.clone(), "/api/peg-health?limit=5000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), PEG_HEALTH_LIMIT);

        let (status, body) = get(state, "/api/zscore?limit=100000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), ZSCORE_LIMIT);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        for uri in ["/api/peg-health?limit=0", "/api/zscore?limit=0"] {
            let (status, body) = get(state_with_data(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error_code"], "INVALID_INPUT");
        }
    }

    #[tokio::test]
    async fn too_many_bins_is_rejected() {
        let (status, body) = get(state_with_data(), "/api/zscore/distribution?bins=501").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_INPUT");

        let (status, _) = get(state_with_data(), "/api/zscore/distribution?bins=500").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn limit_param_parsing() {
        assert_eq!(parse_limit(None, PEG_HEALTH_LIMIT).unwrap(), PEG_HEALTH_LIMIT);
        assert_eq!(parse_limit(Some(10), PEG_HEALTH_LIMIT).unwrap(), 10);
        assert_eq!(parse_limit(Some(5000), PEG_HEALTH_LIMIT).unwrap(), PEG_HEALTH_LIMIT);
        assert!(matches!(
            parse_limit(Some(0), ZSCORE_LIMIT),
            Err(AppError::InvalidInput(_))
        ));
    }
}
