//! Helper doubles and builders for integration tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use aquaguard::FieldSet;
use aquaguard::actors::ingest::{AlertPublisher, IngestionCoordinator};
use aquaguard::actors::sink::{DEFAULT_APPEND_TIMEOUT, SinkHandle};
use aquaguard::broadcaster::Broadcaster;
use aquaguard::evaluator::{AlertEvaluator, AlertEvent, default_rules};
use aquaguard::sink::error::{SinkError, SinkResult};
use aquaguard::sink::{MemorySink, TimeSeriesSink};

/// Publisher that records every alert instead of talking to a broker.
#[derive(Default)]
pub struct RecordingPublisher {
    alerts: Mutex<Vec<AlertEvent>>,
}

impl RecordingPublisher {
    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertPublisher for RecordingPublisher {
    async fn publish_alert(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Publisher whose every publish fails.
pub struct FailingPublisher;

#[async_trait]
impl AlertPublisher for FailingPublisher {
    async fn publish_alert(&self, _alert: &AlertEvent) -> anyhow::Result<()> {
        anyhow::bail!("broker unreachable")
    }
}

/// Sink whose every append fails.
pub struct FailingSink;

#[async_trait]
impl TimeSeriesSink for FailingSink {
    async fn append_point(
        &self,
        _tank_id: &str,
        _timestamp: DateTime<Utc>,
        _fields: &FieldSet,
    ) -> SinkResult<()> {
        Err(SinkError::ConnectionFailed("sink is down".to_string()))
    }

    async fn health_check(&self) -> SinkResult<()> {
        Err(SinkError::ConnectionFailed("sink is down".to_string()))
    }
}

/// Sink that sleeps on every append, for queue-overflow scenarios.
pub struct SlowSink {
    pub delay: Duration,
}

#[async_trait]
impl TimeSeriesSink for SlowSink {
    async fn append_point(
        &self,
        _tank_id: &str,
        _timestamp: DateTime<Utc>,
        _fields: &FieldSet,
    ) -> SinkResult<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn health_check(&self) -> SinkResult<()> {
        Ok(())
    }
}

/// A fully wired pipeline with observable collaborators.
pub struct TestPipeline {
    pub coordinator: IngestionCoordinator,
    pub publisher: Arc<RecordingPublisher>,
    pub broadcaster: Arc<Broadcaster>,
    pub memory: Arc<MemorySink>,
    pub sink: SinkHandle,
}

pub fn build_pipeline(debounce: Duration) -> TestPipeline {
    let memory = Arc::new(MemorySink::new());
    build_pipeline_with(debounce, memory.clone(), memory)
}

pub fn build_pipeline_with(
    debounce: Duration,
    sink: Arc<dyn TimeSeriesSink>,
    memory: Arc<MemorySink>,
) -> TestPipeline {
    let evaluator = Arc::new(AlertEvaluator::new(default_rules(), debounce));
    let broadcaster = Arc::new(Broadcaster::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let sink = SinkHandle::spawn(sink, DEFAULT_APPEND_TIMEOUT);

    let coordinator = IngestionCoordinator::new(
        evaluator,
        sink.clone(),
        broadcaster.clone(),
        publisher.clone(),
    );

    TestPipeline {
        coordinator,
        publisher,
        broadcaster,
        memory,
        sink,
    }
}

pub fn sensor_payload(metric: &str, value: f64) -> Vec<u8> {
    format!(r#"{{"{metric}": {value}}}"#).into_bytes()
}
