pub mod actors;
pub mod api;
pub mod broadcaster;
pub mod config;
pub mod evaluator;
pub mod normalizer;
pub mod sink;
pub mod util;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized snapshot of a tank's sensor metrics at a point in time.
///
/// Readings are transient: created per inbound message, consumed by the
/// pipeline and discarded. Absent metrics are absent, never zero-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub tank_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: FieldSet,
}

impl Reading {
    pub fn new(tank_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tank_id: tank_id.into(),
            timestamp,
            fields: FieldSet::default(),
        }
    }
}

/// The monitored sensor metrics of a reading, each explicitly optional.
///
/// Wire names follow the device vocabulary (`do`, `waterLevel`); fields
/// without a value are omitted from serialization entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ammonia: Option<f64>,

    #[serde(rename = "do", skip_serializing_if = "Option::is_none")]
    pub dissolved_oxygen: Option<f64>,

    #[serde(rename = "waterLevel", skip_serializing_if = "Option::is_none")]
    pub water_level: Option<f64>,
}

impl FieldSet {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Ph => self.ph,
            Metric::Ammonia => self.ammonia,
            Metric::DissolvedOxygen => self.dissolved_oxygen,
            Metric::WaterLevel => self.water_level,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Temperature => self.temperature = Some(value),
            Metric::Ph => self.ph = Some(value),
            Metric::Ammonia => self.ammonia = Some(value),
            Metric::DissolvedOxygen => self.dissolved_oxygen = Some(value),
            Metric::WaterLevel => self.water_level = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|metric| self.get(*metric).is_none())
    }

    /// Present metrics, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .iter()
            .filter_map(|metric| self.get(*metric).map(|value| (*metric, value)))
    }
}

/// The closed set of monitored metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "temperature")]
    Temperature,

    #[serde(rename = "ph")]
    Ph,

    #[serde(rename = "ammonia")]
    Ammonia,

    #[serde(rename = "do")]
    DissolvedOxygen,

    #[serde(rename = "waterLevel")]
    WaterLevel,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Temperature,
        Metric::Ph,
        Metric::Ammonia,
        Metric::DissolvedOxygen,
        Metric::WaterLevel,
    ];

    /// Wire name, as used in topics, payloads and alert bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Ph => "ph",
            Metric::Ammonia => "ammonia",
            Metric::DissolvedOxygen => "do",
            Metric::WaterLevel => "waterLevel",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
