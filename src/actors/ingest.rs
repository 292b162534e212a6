//! IngestionCoordinator - drives the per-message pipeline
//!
//! Every inbound sensor publish runs the same strictly sequential
//! pipeline: normalize → hand off to persistence → evaluate thresholds →
//! publish alerts → broadcast the reading. Messages themselves are
//! processed concurrently (one task per publish); per-key debounce
//! atomicity is the evaluator's job.
//!
//! Failure isolation: a full persistence queue, a failed alert publish or
//! a gone viewer each degrade to a log line. No fault in one stage stops
//! the later stages, and no fault in one message affects the next.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tracing::{error, info, instrument, trace, warn};

use crate::actors::sink::SinkHandle;
use crate::broadcaster::{Broadcaster, LiveMessage};
use crate::evaluator::{AlertEvaluator, AlertEvent};
use crate::normalizer;

/// Topic filter for inbound sensor readings
pub const SENSOR_TOPIC_FILTER: &str = "tanks/+/sensor";

/// Delay before re-polling the event loop after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Outbound transport for fired alerts.
///
/// The pipeline only needs "send this alert somewhere"; putting the MQTT
/// client behind this seam keeps the coordinator testable without a
/// broker.
#[async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish_alert(&self, alert: &AlertEvent) -> anyhow::Result<()>;
}

/// Publishes alerts to `tanks/{tankId}/alerts` with QoS 1.
pub struct MqttAlertPublisher {
    client: AsyncClient,
}

impl MqttAlertPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertPublisher for MqttAlertPublisher {
    async fn publish_alert(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        let topic = format!("tanks/{}/alerts", alert.tank_id);
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;

        Ok(())
    }
}

/// Orchestrates the per-message pipeline for every inbound publish.
#[derive(Clone)]
pub struct IngestionCoordinator {
    evaluator: Arc<AlertEvaluator>,
    sink: SinkHandle,
    broadcaster: Arc<Broadcaster>,
    publisher: Arc<dyn AlertPublisher>,
}

impl IngestionCoordinator {
    pub fn new(
        evaluator: Arc<AlertEvaluator>,
        sink: SinkHandle,
        broadcaster: Arc<Broadcaster>,
        publisher: Arc<dyn AlertPublisher>,
    ) -> Self {
        Self {
            evaluator,
            sink,
            broadcaster,
            publisher,
        }
    }

    /// Drive the MQTT event loop forever.
    ///
    /// Subscribes on every (re)connect; spawns one pipeline task per
    /// inbound publish so readings for different tanks interleave freely.
    /// Reconnection itself is the transport's concern - on error we just
    /// wait briefly and poll again.
    pub async fn run(self, client: AsyncClient, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("connected to broker, subscribing to {SENSOR_TOPIC_FILTER}");
                    if let Err(e) = client.subscribe(SENSOR_TOPIC_FILTER, QoS::AtLeastOnce).await {
                        error!("subscribe failed: {e}");
                    }
                }

                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let coordinator = self.clone();
                    tokio::spawn(async move {
                        coordinator.process(&publish.topic, &publish.payload).await;
                    });
                }

                Ok(_) => {}

                Err(e) => {
                    error!("mqtt connection error: {e}");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// Run one message through the pipeline.
    ///
    /// Strictly sequential within the message; persistence is a
    /// non-blocking hand-off and never delays evaluation or broadcast.
    #[instrument(skip(self, payload))]
    pub async fn process(&self, topic: &str, payload: &[u8]) {
        let reading = normalizer::normalize(topic, payload);
        trace!("normalized reading for {}", reading.tank_id);

        self.sink.enqueue(reading.clone());

        let alerts = self.evaluator.evaluate(&reading);
        for alert in alerts {
            warn!(
                "[ALERT] {} {}={} ({})",
                alert.tank_id, alert.metric, alert.value, alert.level
            );

            if let Err(e) = self.publisher.publish_alert(&alert).await {
                error!("failed to publish alert {}: {e}", alert.id);
            }

            self.broadcaster
                .broadcast(&LiveMessage::Alert { alert })
                .await;
        }

        self.broadcaster
            .broadcast(&LiveMessage::SensorUpdate { data: reading })
            .await;
    }
}
