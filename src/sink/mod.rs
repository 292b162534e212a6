//! Time-series sink for normalized readings
//!
//! The sink is a best-effort collaborator: appends may fail and the
//! pipeline logs and moves on. Implementations must be `Send + Sync` as
//! they are shared across async tasks.

pub mod error;
pub mod influx;
pub mod memory;

pub use error::{SinkError, SinkResult};
pub use influx::InfluxSink;
pub use memory::MemorySink;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::FieldSet;

/// Durable append target for readings.
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    /// Append one point. Best-effort: the caller logs failures and never
    /// surfaces them to the ingestion path.
    async fn append_point(
        &self,
        tank_id: &str,
        timestamp: DateTime<Utc>,
        fields: &FieldSet,
    ) -> SinkResult<()>;

    /// Lightweight probe that the sink is reachable.
    async fn health_check(&self) -> SinkResult<()>;
}
