//! Studio Controller configuration.
//!
//! Configuration is loaded from environment variables with defaults for
//! everything, so the service runs standalone without any setup.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP + WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default time an empty room survives before the reaper removes it.
pub const DEFAULT_ROOM_TTL_SECONDS: u64 = 300;

/// Default interval between reaper passes.
pub const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 30;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Default external output for auto-created audio routes.
pub const DEFAULT_AUDIO_OUTPUT: &str = "obs_main";

/// Default external output for auto-created video routes.
pub const DEFAULT_VIDEO_OUTPUT: &str = "obs_camera1";

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "studio";

/// Studio Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Empty-room time-to-live in seconds (default: 300).
    pub room_ttl_seconds: u64,

    /// Interval between reaper passes in seconds (default: 30).
    pub reaper_interval_seconds: u64,

    /// Per-connection outbound queue capacity (default: 64).
    /// Signaling messages beyond this are dropped, never buffered further.
    pub outbound_buffer: usize,

    /// External output id that auto-created audio routes deliver to.
    pub default_audio_output: String,

    /// External output id that auto-created video routes deliver to.
    pub default_video_output: String,

    /// Unique identifier for this instance, used in logs.
    pub instance_id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("STUDIO_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let room_ttl_seconds =
            parse_positive(vars, "STUDIO_ROOM_TTL_SECONDS", DEFAULT_ROOM_TTL_SECONDS)?;

        let reaper_interval_seconds = parse_positive(
            vars,
            "STUDIO_REAPER_INTERVAL_SECONDS",
            DEFAULT_REAPER_INTERVAL_SECONDS,
        )?;

        let outbound_buffer =
            parse_positive(vars, "STUDIO_OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER)?;

        let default_audio_output = non_empty(vars, "STUDIO_DEFAULT_AUDIO_OUTPUT")?
            .unwrap_or_else(|| DEFAULT_AUDIO_OUTPUT.to_string());

        let default_video_output = non_empty(vars, "STUDIO_DEFAULT_VIDEO_OUTPUT")?
            .unwrap_or_else(|| DEFAULT_VIDEO_OUTPUT.to_string());

        let instance_id = vars.get("STUDIO_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            // First 8 chars of a UUID for uniqueness
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{}-{}-{}", DEFAULT_INSTANCE_ID_PREFIX, hostname, short_suffix)
        });

        Ok(Config {
            bind_address,
            room_ttl_seconds,
            reaper_interval_seconds,
            outbound_buffer,
            default_audio_output,
            default_video_output,
            instance_id,
        })
    }

    /// Empty-room TTL as a `Duration`.
    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.room_ttl_seconds)
    }

    /// Reaper interval as a `Duration`.
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_seconds)
    }
}

fn parse_positive<T>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: T = value_str.parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{} must be a valid positive integer, got '{}': {}",
            key, value_str, e
        ))
    })?;

    if value == T::default() {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be greater than 0",
            key
        )));
    }

    Ok(value)
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Result<Option<String>, ConfigError> {
    match vars.get(key) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue(format!(
            "{} must not be empty",
            key
        ))),
        Some(value) => Ok(Some(value.clone())),
        None => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.room_ttl_seconds, DEFAULT_ROOM_TTL_SECONDS);
        assert_eq!(config.reaper_interval_seconds, DEFAULT_REAPER_INTERVAL_SECONDS);
        assert_eq!(config.outbound_buffer, DEFAULT_OUTBOUND_BUFFER);
        assert_eq!(config.default_audio_output, "obs_main");
        assert_eq!(config.default_video_output, "obs_camera1");
        assert!(config.instance_id.starts_with("studio-"));
        assert_eq!(config.room_ttl(), Duration::from_secs(300));
        assert_eq!(config.reaper_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("STUDIO_BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string()),
            ("STUDIO_ROOM_TTL_SECONDS".to_string(), "60".to_string()),
            ("STUDIO_REAPER_INTERVAL_SECONDS".to_string(), "5".to_string()),
            ("STUDIO_OUTBOUND_BUFFER".to_string(), "8".to_string()),
            (
                "STUDIO_DEFAULT_AUDIO_OUTPUT".to_string(),
                "obs_audio1".to_string(),
            ),
            (
                "STUDIO_DEFAULT_VIDEO_OUTPUT".to_string(),
                "obs_camera2".to_string(),
            ),
            ("STUDIO_INSTANCE_ID".to_string(), "studio-test-1".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.room_ttl_seconds, 60);
        assert_eq!(config.reaper_interval_seconds, 5);
        assert_eq!(config.outbound_buffer, 8);
        assert_eq!(config.default_audio_output, "obs_audio1");
        assert_eq!(config.default_video_output, "obs_camera2");
        assert_eq!(config.instance_id, "studio-test-1");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let vars = HashMap::from([("STUDIO_ROOM_TTL_SECONDS".to_string(), "0".to_string())]);

        let result = Config::from_vars(&vars);

        assert!(
            matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("STUDIO_ROOM_TTL_SECONDS"))
        );
    }

    #[test]
    fn test_unparseable_interval_rejected() {
        let vars = HashMap::from([(
            "STUDIO_REAPER_INTERVAL_SECONDS".to_string(),
            "soon".to_string(),
        )]);

        let result = Config::from_vars(&vars);

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_negative_buffer_rejected() {
        let vars = HashMap::from([("STUDIO_OUTBOUND_BUFFER".to_string(), "-4".to_string())]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_empty_output_rejected() {
        let vars = HashMap::from([("STUDIO_DEFAULT_AUDIO_OUTPUT".to_string(), " ".to_string())]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
