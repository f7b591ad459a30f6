use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use chaomon_service::config::Config;
use chaomon_service::ingest::hii::HiiDamAdapter;
use chaomon_service::ingest::openweather::OpenWeatherAdapter;
use chaomon_service::ingest::thaiwater::ThaiWaterAdapter;
use chaomon_service::ingest::page_fetcher;
use chaomon_service::logging::init_logger;
use chaomon_service::model::now_bangkok;
use chaomon_service::notify::notifier_from_config;
use chaomon_service::orchestrator::{RunReport, run_bridge, run_dam, run_weather};
use chaomon_service::stations::{self, StationId};
use chaomon_service::{summary, verify};

#[derive(Parser, Debug)]
#[command(name = "chaomon", version, about = "Chao Phraya basin water and weather monitor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log alerts instead of sending them.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Directory holding the log and state files.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true, env = "CHAOMON_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Poll the Chao Phraya Dam storage and alert when it changes.
    Dam,
    /// Poll the In Buri bridge water level and alert on large moves.
    Bridge,
    /// Poll the forecast and alert on rain or heat.
    Weather,
    /// Send the daily summary built from the logs.
    Summary,
    /// Fetch every source once and report which ones work.
    Verify {
        /// Print the report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (mut config, warnings) = Config::load(cli.config.as_deref());
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    init_logger(config.log_level, cli.log_json);
    for warning in &warnings {
        tracing::warn!("config: {}", warning);
    }
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        dry_run = config.dry_run,
        threshold_m = config.threshold_m,
        "configuration resolved"
    );

    match run(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command, config: &Config) -> anyhow::Result<()> {
    let now = now_bangkok();
    match command {
        Command::Dam => {
            let fetcher = page_fetcher(config).context("building page fetcher")?;
            let adapter = HiiDamAdapter::new(fetcher.as_ref(), config.dam_url.clone());
            let notifier = notifier_from_config(config);
            let report = run_dam(config, &adapter, notifier.as_ref(), now).context("dam run")?;
            log_report("dam", &report);
        }
        Command::Bridge => {
            let fetcher = page_fetcher(config).context("building page fetcher")?;
            let adapter = ThaiWaterAdapter::new(
                fetcher.as_ref(),
                config.bridge_url.clone(),
                stations::station(StationId::Inburi).name,
            );
            let notifier = notifier_from_config(config);
            let report = run_bridge(config, &adapter, notifier.as_ref(), now).context("bridge run")?;
            log_report("bridge", &report);
        }
        Command::Weather => {
            let adapter = OpenWeatherAdapter::from_config(config).context("building forecast client")?;
            let notifier = notifier_from_config(config);
            let report = run_weather(config, &adapter, notifier.as_ref(), now).context("weather run")?;
            log_report("weather", &report);
        }
        Command::Summary => {
            let notifier = notifier_from_config(config);
            let sent = summary::run_summary(config, notifier.as_ref(), now).context("summary run")?;
            tracing::info!(sent, "summary finished");
        }
        Command::Verify { json } => {
            let report = verify::run_full_verification(config).context("verification")?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
        }
    }
    Ok(())
}

fn log_report(flow: &str, report: &RunReport) {
    tracing::info!(
        flow,
        phase = %report.phase,
        notified = report.notified,
        degraded = report.degraded,
        delivery_failed = report.delivery_failed,
        "run finished"
    );
}
