use anyhow::{Context, Result};
use clap::Parser;
use peg_monitor::{
    cli::{Cli, Command, render_samples, render_summary},
    config::AppConfig,
    dashboard::{self, AppState},
    models::Token,
    oracle::{OracleClient, fetch_all_prices},
    pipeline, scheduler, stats, utils,
    warehouse::Warehouse,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env().context("loading configuration")?;
    cli.apply(&mut cfg).context("applying command-line flags")?;

    tracing::info!(
        command = ?cli.command,
        database = %cfg.database_path.display(),
        "[INIT] peg-monitor starting"
    );

    match cli.command {
        Command::Setup => {
            let warehouse = open_warehouse(&cfg)?;
            warehouse.setup_schema().context("creating schema")?;
            tracing::info!("[INIT] warehouse schema ready");
        }
        Command::Fetch { no_store, csv, .. } => fetch(&cfg, no_store, csv).await?,
        Command::Run => run(&cfg).await?,
        Command::Serve => {
            let warehouse = open_warehouse(&cfg)?;
            dashboard::serve(AppState { warehouse }, &cfg.bind_address)
                .await
                .context("dashboard server")?;
        }
    }
    Ok(())
}

fn open_warehouse(cfg: &AppConfig) -> Result<Warehouse> {
    Warehouse::open(&cfg.database_path)
        .with_context(|| format!("opening warehouse at {}", cfg.database_path.display()))
}

async fn connect(cfg: &AppConfig) -> Result<OracleClient> {
    let rpc_url = cfg.rpc_url()?;
    OracleClient::connect(rpc_url)
        .await
        .context("connecting to Ethereum RPC")
}

async fn fetch(cfg: &AppConfig, no_store: bool, csv: bool) -> Result<()> {
    let client = connect(cfg).await?;
    let now = utils::unix_now();

    let samples = if no_store {
        fetch_all_prices(&client, Token::all(), now).await?
    } else {
        let warehouse = open_warehouse(cfg)?;
        let summary =
            pipeline::run_once(&client, &warehouse, Token::all(), cfg.rolling_window_secs, now)
                .await?;
        println!(
            "loaded {} rows ({} total, {} tokens)",
            summary.rows_loaded, summary.total_rows, summary.distinct_tokens
        );
        summary.samples
    };

    print!("{}", render_samples(&samples));
    if let Some(summary) = stats::summarize(&samples) {
        println!();
        print!("{}", render_summary(&summary));
    }
    if csv {
        let path = pipeline::write_csv(&samples, &cfg.csv_output_dir)?;
        println!("saved {}", path.display());
    }
    Ok(())
}

async fn run(cfg: &AppConfig) -> Result<()> {
    let warehouse = open_warehouse(cfg)?;
    let client = connect(cfg).await?;
    let window = cfg.rolling_window_secs;

    let job_warehouse = warehouse.clone();
    let job = scheduler::spawn(cfg.schedule, move || {
        let client = client.clone();
        let warehouse = job_warehouse.clone();
        async move {
            pipeline::run_once(&client, &warehouse, Token::all(), window, utils::unix_now()).await
        }
    });
    tracing::info!(schedule = ?cfg.schedule, "[INIT] scheduler started");

    let served = dashboard::serve(AppState { warehouse }, &cfg.bind_address).await;
    job.abort();
    served.context("dashboard server")
}
