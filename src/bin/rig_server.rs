use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use capsense_rig::config::AppConfig;
use capsense_rig::export::Exporter;
use capsense_rig::http::{run_http_server, AppState};
use capsense_rig::run::RunController;
use capsense_rig::source::{SampleSource, SerialSource};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(
    name = "rig_server",
    about = "Test orchestration server for the capacitive sensor rig"
)]
struct Cli {
    /// Path to JSON configuration file (defaults to rig_config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(long)]
    listen: Option<String>,

    /// Serial port to pull samples from (overrides config; omit for
    /// push-only mode)
    #[arg(long)]
    serial_port: Option<String>,

    /// Baud rate for the serial port (overrides config)
    #[arg(long)]
    baud: Option<u32>,

    /// Directory for CSV and plot output (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(port) = cli.serial_port {
        config.acquisition.serial_port = Some(port);
    }
    if let Some(baud) = cli.baud {
        config.acquisition.baud_rate = baud;
    }
    if let Some(data_dir) = cli.data_dir {
        config.export.data_dir = data_dir.display().to_string();
    }

    let exporter = Exporter::new(PathBuf::from(&config.export.data_dir));
    let controller = Arc::new(RunController::new(
        exporter.clone(),
        Duration::from_millis(config.acquisition.poll_interval_ms),
    ));

    let serial = config.acquisition.serial_port.as_ref().map(|port| {
        SerialSource::new(port.clone(), config.acquisition.baud_rate)
    });
    if let Some(source) = &serial {
        source
            .start(Arc::clone(&controller))
            .context("starting serial sample source")?;
    }

    let addr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("parsing listen address {}", config.server.listen_addr))?;
    let state = AppState::new(Arc::clone(&controller), exporter);

    info!("Rig server listening on {}", addr);
    let result = tokio::select! {
        served = run_http_server(state, addr) => served,
        signalled = tokio::signal::ctrl_c() => {
            signalled.context("waiting for shutdown signal")?;
            info!("Shutdown signal received");
            Ok(())
        }
    };

    // Orderly teardown: stop the reader first so no new samples arrive,
    // then finalize any in-flight run.
    if let Some(source) = &serial {
        source.stop();
    }
    controller.stop();
    controller.join_scheduler();

    result
}
