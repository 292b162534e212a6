//! In-memory sink
//!
//! Used when persistence is disabled and as a recording double in tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::FieldSet;

use super::TimeSeriesSink;
use super::error::SinkResult;

/// One appended point.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub tank_id: String,
    pub timestamp: DateTime<Utc>,
    pub fields: FieldSet,
}

/// Sink that keeps appended points in memory.
#[derive(Default)]
pub struct MemorySink {
    points: Mutex<Vec<StoredPoint>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<StoredPoint> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TimeSeriesSink for MemorySink {
    async fn append_point(
        &self,
        tank_id: &str,
        timestamp: DateTime<Utc>,
        fields: &FieldSet,
    ) -> SinkResult<()> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredPoint {
                tank_id: tank_id.to_string(),
                timestamp,
                fields: *fields,
            });
        Ok(())
    }

    async fn health_check(&self) -> SinkResult<()> {
        Ok(())
    }
}
