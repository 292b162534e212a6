use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rumqttc::{AsyncClient, MqttOptions};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use aquaguard::{
    actors::{
        ingest::{IngestionCoordinator, MqttAlertPublisher},
        sink::SinkHandle,
    },
    api::{ApiState, spawn_api_server},
    broadcaster::Broadcaster,
    config::{Config, SinkConfig, read_config_file},
    evaluator::{AlertEvaluator, default_rules},
    sink::{InfluxSink, MemorySink, TimeSeriesSink},
    util,
};

/// Interval between debounce-map hygiene sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("aquaguard", LevelFilter::TRACE),
        ("hub", LevelFilter::TRACE),
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

    let mut config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    if let Some(url) = util::get_broker_url() {
        config.mqtt.url = url;
    }
    if let Some(ms) = util::get_debounce_ms() {
        config.alerts.debounce_ms = ms;
    }

    let rules = config.alerts.rules.clone().unwrap_or_else(default_rules);
    let evaluator = Arc::new(AlertEvaluator::new(
        rules,
        Duration::from_millis(config.alerts.debounce_ms),
    ));
    let broadcaster = Arc::new(Broadcaster::new());

    let (sink, sink_timeout): (Arc<dyn TimeSeriesSink>, Duration) =
        match config.sink.clone().unwrap_or_default() {
            SinkConfig::None => {
                info!("persistence disabled, using in-memory sink");
                (
                    Arc::new(MemorySink::new()),
                    aquaguard::actors::sink::DEFAULT_APPEND_TIMEOUT,
                )
            }
            SinkConfig::Influx {
                url,
                database,
                timeout_secs,
            } => {
                let url = util::get_influx_url().unwrap_or(url);
                let database = util::get_influx_database().unwrap_or(database);
                let timeout = Duration::from_secs(timeout_secs);

                let influx = InfluxSink::new(&url, &database, timeout)?;
                if let Err(e) = influx.ensure_database().await {
                    warn!("could not ensure influx database: {e}");
                }
                info!("persisting readings to {url} (database {database})");

                (Arc::new(influx), timeout)
            }
        };
    let sink_handle = SinkHandle::spawn(sink, sink_timeout);

    let api_addr = spawn_api_server(
        config.http.bind_addr,
        ApiState {
            broadcaster: broadcaster.clone(),
        },
    )
    .await?;
    info!("live feed available on ws://{api_addr}/ws");

    let (host, port) = config.mqtt.broker_parts();
    info!("connecting to broker {host}:{port}");
    let mut options = MqttOptions::new(config.mqtt.client_id.clone(), host, port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, eventloop) = AsyncClient::new(options, 64);

    let coordinator = IngestionCoordinator::new(
        evaluator.clone(),
        sink_handle,
        broadcaster,
        Arc::new(MqttAlertPublisher::new(client.clone())),
    );

    let sweeper = evaluator.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.evict_expired();
        }
    });

    coordinator.run(client, eventloop).await;

    Ok(())
}
