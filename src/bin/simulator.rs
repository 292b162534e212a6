use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use aquaguard::{config::MqttConfig, util};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Broker url (overrides MQTT_BROKER_URL)
    #[arg(long)]
    broker: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("aquaguard", LevelFilter::TRACE),
        ("simulator", LevelFilter::TRACE),
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

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mqtt = MqttConfig {
        url: args
            .broker
            .or_else(util::get_broker_url)
            .unwrap_or_else(|| String::from("mqtt://localhost:1883")),
        client_id: String::from("aquaguard-sim"),
    };
    let tanks = util::get_sim_tanks();
    let interval_ms = util::get_sim_interval_ms();

    let (host, port) = mqtt.broker_parts();
    info!(
        "simulating {} tanks against {host}:{port} every {interval_ms}ms",
        tanks.len()
    );

    let mut options = MqttOptions::new(mqtt.client_id.clone(), host, port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(options, 64);

    // keep the connection alive; publish results surface here
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                error!("mqtt connection error: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        interval.tick().await;

        let ts = Utc::now().to_rfc3339();
        for tank in &tanks {
            let payload = {
                let mut rng = rand::thread_rng();
                serde_json::json!({
                    "temperature": round_to(22.0 + rng.gen_range(0.0..6.0), 2),
                    "ph": round_to(6.8 + (rng.gen_range(0.0..1.0) - 0.5) * 0.4, 2),
                    "ammonia": round_to(rng.gen_range(0.0..0.6), 3),
                    "do": round_to(5.0 + rng.gen_range(0.0..2.0), 2),
                    "waterLevel": round_to(30.0 + rng.gen_range(0.0..10.0), 2),
                    "ts": ts,
                })
            };

            let topic = format!("tanks/{tank}/sensor");
            if let Err(e) = client
                .publish(topic, QoS::AtLeastOnce, false, payload.to_string())
                .await
            {
                error!("{tank}: publish failed: {e}");
            }
        }
    }
}
