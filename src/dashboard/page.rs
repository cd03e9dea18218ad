//! Server-rendered overview page.

use crate::models::{PegHealthRow, ZScoreRow};
use crate::utils::format_timestamp;
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;margin-bottom:2rem}\
th,td{border:1px solid #ccc;padding:.3rem .6rem;text-align:right}\
.healthy,.normal{color:#1a7f37}.warning,.unusual{color:#b08800}\
.critical,.outlier{color:#cf222e}";

pub fn render(latest: &[PegHealthRow], recent: &[ZScoreRow], counts: (i64, i64)) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    html.push_str("<title>Stablecoin Peg Monitor</title>");
    let _ = write!(html, "<style>{STYLE}</style></head><body>");
    html.push_str("<h1>Stablecoin Peg Monitor</h1>");
    let _ = write!(
        html,
        "<p>{} samples across {} tokens. JSON series under <code>/api</code>.</p>",
        counts.0, counts.1
    );

    html.push_str("<h2>Current peg status</h2>");
    if latest.is_empty() {
        html.push_str("<p>No data yet. Run <code>peg-monitor fetch</code> first.</p>");
    } else {
        html.push_str(
            "<table><tr><th>Token</th><th>Price</th><th>Deviation %</th>\
             <th>Status</th><th>As of (UTC)</th></tr>",
        );
        for r in latest {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>${:.6}</td><td>{:+.4}%</td>\
                 <td class=\"{status}\">{status}</td><td>{}</td></tr>",
                r.token,
                r.price,
                r.deviation_from_peg_pct,
                format_timestamp(r.timestamp),
                status = r.peg_status.as_str(),
            );
        }
        html.push_str("</table>");
    }

    if !recent.is_empty() {
        html.push_str("<h2>Recent rolling z-scores</h2>");
        html.push_str(
            "<table><tr><th>Time (UTC)</th><th>Token</th><th>Price</th>\
             <th>Mean dev</th><th>Stddev</th><th>Z</th><th>Status</th></tr>",
        );
        for r in recent {
            let stddev = r
                .rolling_stddev_24h
                .map(|s| format!("{s:.6}"))
                .unwrap_or_else(|| "-".into());
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{:.6}</td><td>{:+.6}</td><td>{}</td>\
                 <td>{:+.3}</td><td class=\"{status}\">{status}</td></tr>",
                format_timestamp(r.timestamp),
                r.token,
                r.price,
                r.rolling_mean_24h,
                stddev,
                r.zscore,
                status = r.zscore_status.as_str(),
            );
        }
        html.push_str("</table>");
    }

    html.push_str("</body></html>");
    html
}
