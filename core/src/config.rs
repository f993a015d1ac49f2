//! Poll cadence configuration.
//!
//! Intervals are passed into every poller explicitly so tests can run the
//! whole protocol with zero waits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cadence used when the service sends no `Retry-After`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Interval between polls when the service does not say otherwise.
    #[serde(with = "seconds")]
    pub default_interval: Duration,
    /// Wait before the first poll. `None` uses the first poll interval.
    #[serde(with = "optional_seconds")]
    pub initial_delay: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_POLL_INTERVAL,
            initial_delay: None,
        }
    }
}

impl PollerConfig {
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod optional_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ten_second_cadence() {
        let config = PollerConfig::default();
        assert_eq!(config.default_interval, Duration::from_secs(10));
        assert!(config.initial_delay.is_none());
    }

    #[test]
    fn reads_whole_seconds() {
        let config: PollerConfig =
            serde_json::from_str(r#"{"default_interval":20,"initial_delay":5}"#).unwrap();
        assert_eq!(config.default_interval, Duration::from_secs(20));
        assert_eq!(config.initial_delay, Some(Duration::from_secs(5)));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: PollerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PollerConfig::default());
    }

    #[test]
    fn writes_whole_seconds() {
        let config = PollerConfig::default().with_initial_delay(Duration::from_secs(3));
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["default_interval"], 10);
        assert_eq!(json["initial_delay"], 3);
    }
}
