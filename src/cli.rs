//! Command-line interface for the `peg-monitor` binary.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::PriceSample;
use crate::stats::FetchSummary;
use crate::utils::format_timestamp;
use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "peg-monitor")]
#[command(about = "Chainlink stablecoin peg monitor", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite warehouse file
    #[arg(long, global = true, env = "DATABASE_PATH")]
    pub database: Option<PathBuf>,

    /// Dashboard bind address
    #[arg(long, global = true, env = "BIND_ADDRESS")]
    pub bind: Option<String>,

    /// Rolling statistics lookback in seconds
    #[arg(long, global = true, env = "ROLLING_WINDOW_SECS")]
    pub window_secs: Option<i64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create the warehouse tables and views
    Setup,

    /// Fetch current prices once and print them
    Fetch {
        /// Print only, do not load into the warehouse
        #[arg(long)]
        no_store: bool,

        /// Also write chainlink_prices.csv
        #[arg(long)]
        csv: bool,

        /// Directory for the CSV file
        #[arg(long, env = "CSV_OUTPUT_DIR")]
        csv_dir: Option<PathBuf>,
    },

    /// Run the scheduled pipeline and the dashboard
    Run,

    /// Serve the dashboard only
    Serve,
}

impl Cli {
    /// Flags win over values loaded from the environment.
    pub fn apply(&self, cfg: &mut AppConfig) -> Result<()> {
        if let Some(path) = &self.database {
            cfg.database_path = path.clone();
        }
        if let Some(bind) = &self.bind {
            cfg.bind_address = bind.clone();
        }
        if let Some(secs) = self.window_secs {
            if secs <= 0 {
                return Err(AppError::Config(format!(
                    "--window-secs must be positive, got {secs}"
                )));
            }
            cfg.rolling_window_secs = secs;
        }
        if let Command::Fetch {
            csv_dir: Some(dir), ..
        } = &self.command
        {
            cfg.csv_output_dir = dir.clone();
        }
        Ok(())
    }
}

/// Fixed-width table of one fetch.
pub fn render_samples(samples: &[PriceSample]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<6} {:>12} {:>14}",
        "timestamp", "token", "price", "deviation %"
    );
    for s in samples {
        let _ = writeln!(
            out,
            "{:<20} {:<6} {:>12.6} {:>13.4}%",
            format_timestamp(s.timestamp),
            s.token.symbol(),
            s.price,
            s.deviation_from_peg * 100.0
        );
    }
    out
}

pub fn render_summary(summary: &FetchSummary) -> String {
    format!(
        "samples: {}\nmean price: {:.6}\nmean deviation: {:+.4}%\nmax |deviation|: {:.4}%\n",
        summary.count,
        summary.mean_price,
        summary.mean_deviation * 100.0,
        summary.max_abs_deviation * 100.0
    )
}
