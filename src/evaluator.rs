//! Threshold evaluation with per-key debouncing
//!
//! The evaluator is the only component with temporal state: a map from
//! (tank, metric, level) to the last time an alert fired for that key.
//! It is constructed once, shared behind an `Arc`, and never errors: a
//! fault on one metric must not prevent evaluation of the rest.
//!
//! ## Debounce
//!
//! ```text
//! violation, no entry / entry older than window  → fire, stamp key
//! violation, entry within window                 → suppress, no mutation
//! ```
//!
//! The check-and-set happens under a single mutex acquisition, so two
//! concurrent violating readings for the same key can never both fire.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Metric, Reading};

/// Minimum interval between two alerts sharing one key.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300_000);

/// A per-metric min and/or max bound defining the normal operating range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub metric: Metric,

    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,
}

/// Which side of the operating range was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    #[serde(rename = "LOW")]
    Low,

    #[serde(rename = "HIGH")]
    High,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "LOW",
            AlertLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of one debounce slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub tank_id: String,
    pub metric: Metric,
    pub level: AlertLevel,
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tank_id, self.metric, self.level)
    }
}

/// One fired alert. Exists only as a published/broadcast artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: String,
    pub tank_id: String,
    pub metric: Metric,
    pub level: AlertLevel,
    pub value: f64,
    pub ts: DateTime<Utc>,
}

/// Default operating ranges for a healthy aquaponics tank.
pub fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            metric: Metric::Temperature,
            min: Some(20.0),
            max: Some(30.0),
        },
        ThresholdRule {
            metric: Metric::Ph,
            min: Some(6.5),
            max: Some(8.0),
        },
        ThresholdRule {
            metric: Metric::Ammonia,
            min: None,
            max: Some(0.5),
        },
        ThresholdRule {
            metric: Metric::DissolvedOxygen,
            min: Some(5.0),
            max: None,
        },
        ThresholdRule {
            metric: Metric::WaterLevel,
            min: Some(30.0),
            max: None,
        },
    ]
}

/// Stateful threshold evaluator with per-key debouncing.
pub struct AlertEvaluator {
    rules: Vec<ThresholdRule>,
    debounce: Duration,
    last_fired: Mutex<HashMap<AlertKey, Instant>>,
}

impl AlertEvaluator {
    pub fn new(rules: Vec<ThresholdRule>, debounce: Duration) -> Self {
        Self {
            rules,
            debounce,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_rules(), DEFAULT_DEBOUNCE)
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce
    }

    /// Evaluate one reading against every configured rule.
    ///
    /// Metrics the reading lacks, and non-finite values, are skipped. The
    /// min bound is checked before the max bound; when a rule configures
    /// both and both are violated, the max check overwrites the min result.
    pub fn evaluate(&self, reading: &Reading) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for rule in &self.rules {
            let Some(value) = reading.fields.get(rule.metric) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }

            let mut level = None;
            if let Some(min) = rule.min
                && value < min
            {
                level = Some(AlertLevel::Low);
            }
            if let Some(max) = rule.max
                && value > max
            {
                level = Some(AlertLevel::High);
            }
            let Some(level) = level else {
                continue;
            };

            let key = AlertKey {
                tank_id: reading.tank_id.clone(),
                metric: rule.metric,
                level,
            };

            if !self.try_fire(&key) {
                trace!("alert {key} suppressed (within debounce window)");
                continue;
            }

            let now = Utc::now();
            events.push(AlertEvent {
                id: format!("{key}:{}", now.timestamp_millis()),
                tank_id: reading.tank_id.clone(),
                metric: rule.metric,
                level,
                value,
                ts: now,
            });
        }

        events
    }

    /// Atomic check-and-set for one key: returns whether the alert may
    /// fire, stamping the key if so. Suppression mutates nothing.
    fn try_fire(&self, key: &AlertKey) -> bool {
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let fire = match last_fired.get(key) {
            Some(last) => last.elapsed() >= self.debounce,
            None => true,
        };
        if fire {
            last_fired.insert(key.clone(), Instant::now());
        }
        fire
    }

    /// Drop entries old enough that they can no longer suppress anything.
    ///
    /// The key space is bounded by #tanks × #metrics × #levels, so this is
    /// optional hygiene rather than a correctness requirement.
    pub fn evict_expired(&self) {
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let before = last_fired.len();
        last_fired.retain(|_, fired| fired.elapsed() < self.debounce);
        let evicted = before - last_fired.len();
        if evicted > 0 {
            trace!("evicted {evicted} expired debounce entries");
        }
    }

    /// Number of live debounce slots.
    pub fn tracked_keys(&self) -> usize {
        self.last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
