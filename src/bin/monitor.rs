use std::sync::Arc;

use clap::Parser;
use fleet_monitoring::{
    config::{Config, read_config_file},
    gateway::CommandGateway,
    monitor::MonitorHandle,
};
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("fleet_monitoring", LevelFilter::TRACE),
        ("vigil_monitor", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let gateway = Arc::new(CommandGateway::new(&config));
    let monitor = MonitorHandle::spawn(config, gateway);

    tokio::signal::ctrl_c().await?;
    debug!("interrupt received, shutting down");
    monitor.shutdown().await?;

    Ok(())
}
