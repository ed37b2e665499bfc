use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A candidate instance of an action: how likely it is, when it runs and what it carries.
///
/// The scheduler only reads `weight`, `delay`, `postdelay` and `priority`; `payload` is opaque
/// and decoded by the action that produced the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outcome {
    /// Relative likelihood of being drawn. Zero, negative or NaN excludes the outcome.
    pub weight: f64,
    /// Wait before executing.
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    /// Wait after a successful execution before the next item may start.
    #[serde(rename = "postdelay_ms", with = "millis")]
    pub postdelay: Duration,
    /// Queue ordering key; higher runs sooner.
    pub priority: i32,
    pub payload: serde_json::Value,
}

impl Default for Outcome {
    fn default() -> Self {
        Self {
            weight: 0.0,
            delay: Duration::ZERO,
            postdelay: Duration::ZERO,
            priority: 1,
            payload: serde_json::Value::Null,
        }
    }
}

impl Outcome {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            ..Self::default()
        }
    }

    /// An outcome meant for direct enqueueing; its weight is irrelevant.
    pub fn forced() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_postdelay(mut self, postdelay: Duration) -> Self {
        self.postdelay = postdelay;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a serializable payload. Values that fail to serialize are stored as `null`,
    /// which the owning action then rejects when decoding.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
        self
    }

    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// Weight usable in a draw, or `None` if the outcome is excluded.
    pub fn effective_weight(&self) -> Option<f64> {
        (self.weight.is_finite() && self.weight > 0.0).then_some(self.weight)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
