use std::time::Duration;

use crate::config::PersonalityConfig;

/// How fast the bot types and reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Personality {
    /// Characters per minute
    pub type_speed: f64,
    /// Characters per minute
    pub read_speed: f64,
}

impl Personality {
    pub fn type_duration(&self, msg: &str) -> Duration {
        chars_per_minute(msg, self.type_speed)
    }

    pub fn read_duration(&self, msg: &str) -> Duration {
        chars_per_minute(msg, self.read_speed)
    }
}

impl Default for Personality {
    fn default() -> Self {
        PersonalityConfig::default().into()
    }
}

impl From<PersonalityConfig> for Personality {
    fn from(config: PersonalityConfig) -> Self {
        Self {
            type_speed: config.type_speed,
            read_speed: config.read_speed,
        }
    }
}

fn chars_per_minute(msg: &str, speed: f64) -> Duration {
    if speed.is_nan() || speed <= 0.0 {
        return Duration::ZERO;
    }
    let len = msg.chars().count() as f64;
    Duration::try_from_secs_f64(60.0 * len / speed).unwrap_or(Duration::MAX)
}
