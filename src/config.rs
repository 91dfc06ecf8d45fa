// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use chrono_tz::Tz;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll frequency must be at least one second")]
    InvalidPollFrequency,
    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),
}

/// Settings for one realtime vehicle position feed.
///
/// Every flag can also come from the environment (and so from `.env`).
#[derive(clap::Args, Debug, Clone, Serialize, Deserialize)]
pub struct VehicleFeedConfig {
    /// GTFS-realtime vehicle positions url
    #[arg(long, env = "VEHICLE_FEED_URL")]
    pub url: String,

    /// Agency used to qualify the bare ids found in the feed
    #[arg(long, env = "VEHICLE_FEED_DEFAULT_AGENCY_ID")]
    pub default_agency_id: String,

    #[arg(long, env = "VEHICLE_FEED_POLL_FREQUENCY_SECONDS", default_value_t = 60)]
    pub poll_frequency_seconds: u64,

    /// Connect and read timeout for each fetch
    #[arg(long, env = "VEHICLE_FEED_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// IANA timezone used to decide what "today" is for trips without a start date
    #[arg(long, env = "VEHICLE_FEED_TIMEZONE", default_value = "UTC")]
    pub timezone: String,
}

impl VehicleFeedConfig {
    pub fn new(url: impl Into<String>, default_agency_id: impl Into<String>) -> Self {
        VehicleFeedConfig {
            url: url.into(),
            default_agency_id: default_agency_id.into(),
            poll_frequency_seconds: 60,
            timeout_ms: 5000,
            timezone: "UTC".to_string(),
        }
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        match self.poll_frequency_seconds {
            0 => Err(ConfigError::InvalidPollFrequency),
            seconds => Ok(Duration::from_secs(seconds)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.poll_interval()?;
        self.timezone()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        feed: VehicleFeedConfig,
    }

    #[test]
    fn defaults_apply() {
        let cli = TestCli::try_parse_from([
            "test",
            "--url",
            "https://example.com/vehicles.pb",
            "--default-agency-id",
            "ta",
        ])
        .unwrap();

        assert_eq!(cli.feed.poll_frequency_seconds, 60);
        assert_eq!(cli.feed.timeout(), Duration::from_millis(5000));
        assert_eq!(cli.feed.timezone().unwrap(), chrono_tz::UTC);
        assert!(cli.feed.validate().is_ok());
    }

    #[test]
    fn rejects_zero_poll_frequency() {
        let mut config = VehicleFeedConfig::new("https://example.com", "ta");
        config.poll_frequency_seconds = 0;

        assert_eq!(config.validate(), Err(ConfigError::InvalidPollFrequency));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut config = VehicleFeedConfig::new("https://example.com", "ta");
        config.timezone = "Mars/Olympus_Mons".to_string();

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimezone("Mars/Olympus_Mons".to_string()))
        );

        config.timezone = "America/Los_Angeles".to_string();
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::Los_Angeles);
    }
}
