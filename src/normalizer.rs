//! Reading normalization
//!
//! Turns a raw MQTT topic + payload into a canonical [`Reading`]. The
//! normalizer is total: malformed topics and payloads degrade to an empty
//! field set instead of erroring, so one broken device can never stall the
//! pipeline.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::{FieldSet, Metric, Reading};

/// Raw key spellings accepted from devices, mapped to canonical metrics.
///
/// Processed in declaration order; when a payload carries more than one
/// alias for the same metric, the last one processed wins.
const ALIASES: [(&str, Metric); 9] = [
    ("temperature", Metric::Temperature),
    ("temp", Metric::Temperature),
    ("pH", Metric::Ph),
    ("ph", Metric::Ph),
    ("ammonia", Metric::Ammonia),
    ("DO", Metric::DissolvedOxygen),
    ("do", Metric::DissolvedOxygen),
    ("waterLevel", Metric::WaterLevel),
    ("water_level", Metric::WaterLevel),
];

/// Normalize one inbound sensor message.
///
/// The tank id comes from the topic (`tanks/{tankId}/sensor`), the metric
/// values from the JSON payload. The timestamp is the payload's `ts` when
/// it parses as RFC 3339, otherwise the current processing time.
pub fn normalize(topic: &str, payload: &[u8]) -> Reading {
    let tank_id = tank_id_from_topic(topic);

    let value = match serde_json::from_slice::<Value>(payload) {
        Ok(value) => value,
        Err(_) => {
            warn!("non-JSON payload on {topic}");
            Value::Null
        }
    };

    let mut fields = FieldSet::default();
    let mut timestamp = None;

    if let Value::Object(map) = &value {
        for (alias, metric) in ALIASES {
            if let Some(raw) = map.get(alias)
                && let Some(number) = numeric(raw)
            {
                fields.set(metric, number);
            }
        }

        timestamp = map
            .get("ts")
            .and_then(Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc));
    }

    Reading {
        tank_id,
        timestamp: timestamp.unwrap_or_else(Utc::now),
        fields,
    }
}

/// Extract a numeric value; non-numeric input contributes nothing.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn tank_id_from_topic(topic: &str) -> String {
    let mut segments = topic.split('/');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some("tanks"), Some(id), Some("sensor"), None) if !id.is_empty() => id.to_string(),
        _ => String::from("unknown"),
    }
}
