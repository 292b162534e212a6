//! InfluxDB v1 sink
//!
//! Appends readings via the HTTP write endpoint using line protocol:
//!
//! ```text
//! readings,tankId=tank1 temperature=24.5,ph=7.1 1700000000000000000
//! ```
//!
//! One measurement (`readings`), the tank id as the only tag, one field
//! per present metric, nanosecond timestamps.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::FieldSet;

use super::error::{SinkError, SinkResult};
use super::TimeSeriesSink;

const MEASUREMENT: &str = "readings";

/// Sink writing to an InfluxDB v1 HTTP endpoint.
pub struct InfluxSink {
    client: reqwest::Client,
    base_url: String,
    database: String,
}

impl InfluxSink {
    /// Create a sink for `base_url` (e.g. `http://localhost:8086`).
    ///
    /// The request timeout bounds every write so an unreachable sink
    /// cannot hold on to pending work.
    pub fn new(base_url: &str, database: &str, timeout: Duration) -> SinkResult<Self> {
        if base_url.is_empty() {
            return Err(SinkError::InvalidConfig("empty influx url".to_string()));
        }
        if database.is_empty() {
            return Err(SinkError::InvalidConfig("empty influx database".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database: database.to_string(),
        })
    }

    /// Create the database if it does not exist yet. Best-effort, called
    /// once at startup.
    pub async fn ensure_database(&self) -> SinkResult<()> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .query(&[("q", format!("CREATE DATABASE \"{}\"", self.database))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SinkError::ConnectionFailed(format!(
                "CREATE DATABASE returned {}",
                response.status()
            )));
        }

        debug!("influx database {} ready", self.database);
        Ok(())
    }

    fn line(&self, tank_id: &str, timestamp: DateTime<Utc>, fields: &FieldSet) -> String {
        let mut line = format!("{MEASUREMENT},tankId={}", escape_tag(tank_id));

        let mut separator = ' ';
        for (metric, value) in fields.iter() {
            line.push(separator);
            line.push_str(metric.as_str());
            line.push('=');
            line.push_str(&value.to_string());
            separator = ',';
        }

        let nanos = timestamp
            .timestamp_nanos_opt()
            .unwrap_or_else(|| timestamp.timestamp_millis().saturating_mul(1_000_000));
        line.push(' ');
        line.push_str(&nanos.to_string());

        line
    }
}

#[async_trait]
impl TimeSeriesSink for InfluxSink {
    async fn append_point(
        &self,
        tank_id: &str,
        timestamp: DateTime<Utc>,
        fields: &FieldSet,
    ) -> SinkResult<()> {
        // a line without fields is invalid protocol
        if fields.is_empty() {
            return Ok(());
        }

        let line = self.line(tank_id, timestamp, fields);
        trace!("writing point: {line}");

        let response = self
            .client
            .post(format!("{}/write", self.base_url))
            .query(&[("db", self.database.as_str())])
            .body(line)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::WriteFailed(format!("{status}: {body}")));
        }

        Ok(())
    }

    async fn health_check(&self) -> SinkResult<()> {
        let response = self
            .client
            .get(format!("{}/ping", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SinkError::ConnectionFailed(format!(
                "ping returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Escape a tag value per line protocol (commas, spaces, equals).
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
