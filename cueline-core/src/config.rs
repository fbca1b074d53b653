use std::{env, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::Policy;

/// The configuration of a queue client
#[derive(Debug, Clone)]
pub struct Config {
    /// The base url of the server api, every endpoint is relative to this
    pub server_url: String,
    /// Where credentials are persisted between runs
    pub session_file: PathBuf,
    /// How often the queue snapshot is polled
    pub queue_poll_interval: Duration,
    /// How often the current song is polled, shorter since playback position must track closely
    pub current_song_poll_interval: Duration,
    /// How long a single request may take before it counts as a transport failure
    pub request_timeout: Duration,
    /// Credentials expiring within this window are refreshed ahead of time
    pub expiry_leeway: Duration,
    /// Whether polling stops once the session is lost, instead of continuing unauthenticated
    pub stop_on_session_loss: bool,
    pub policy: Policy,
}

#[derive(Debug, Error)]
#[error("Environment variable {name} has invalid value {value:?}")]
pub struct ConfigError {
    name: &'static str,
    value: String,
}

impl Config {
    pub const SERVER_URL_VAR: &'static str = "CUELINE_SERVER_URL";
    pub const SESSION_FILE_VAR: &'static str = "CUELINE_SESSION_FILE";
    pub const QUEUE_INTERVAL_VAR: &'static str = "CUELINE_QUEUE_INTERVAL_MS";
    pub const CURRENT_INTERVAL_VAR: &'static str = "CUELINE_CURRENT_INTERVAL_MS";
    pub const TIMEOUT_VAR: &'static str = "CUELINE_TIMEOUT_MS";
    pub const LEEWAY_VAR: &'static str = "CUELINE_EXPIRY_LEEWAY_SECS";
    pub const STOP_ON_SESSION_LOSS_VAR: &'static str = "CUELINE_STOP_ON_SESSION_LOSS";
    pub const ANONYMOUS_MODERATION_VAR: &'static str = "CUELINE_ANONYMOUS_MODERATION";

    /// Reads the configuration from the environment, falling back to defaults for missing values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            server_url: env::var(Self::SERVER_URL_VAR).unwrap_or(defaults.server_url),
            session_file: env::var(Self::SESSION_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            queue_poll_interval: read_var(Self::QUEUE_INTERVAL_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.queue_poll_interval),
            current_song_poll_interval: read_var(Self::CURRENT_INTERVAL_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.current_song_poll_interval),
            request_timeout: read_var(Self::TIMEOUT_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            expiry_leeway: read_var(Self::LEEWAY_VAR)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.expiry_leeway),
            stop_on_session_loss: read_var(Self::STOP_ON_SESSION_LOSS_VAR)?
                .unwrap_or(defaults.stop_on_session_loss),
            policy: Policy {
                anonymous_moderation: read_var(Self::ANONYMOUS_MODERATION_VAR)?
                    .unwrap_or(defaults.policy.anonymous_moderation),
            },
        })
    }

    /// Returns the server url with a trailing slash, so relative paths join below it
    pub fn normalized_server_url(&self) -> String {
        if self.server_url.ends_with('/') {
            self.server_url.clone()
        } else {
            format!("{}/", self.server_url)
        }
    }

    /// Returns the expiry leeway in whole seconds, as used when comparing token claims
    pub fn expiry_leeway_in_seconds(&self) -> i64 {
        self.expiry_leeway.as_secs() as i64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/api/".to_string(),
            session_file: PathBuf::from(".cueline-session.ron"),
            queue_poll_interval: Duration::from_secs(5),
            current_song_poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            expiry_leeway: Duration::from_secs(10),
            stop_on_session_loss: false,
            policy: Policy::default(),
        }
    }
}

fn read_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { name, value }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.queue_poll_interval, Duration::from_secs(5));
        assert_eq!(config.current_song_poll_interval, Duration::from_secs(1));
        assert!(config.policy.anonymous_moderation);
        assert!(!config.stop_on_session_loss);
    }

    #[test]
    fn test_normalized_server_url() {
        let mut config = Config {
            server_url: "http://example.com/api".to_string(),
            ..Default::default()
        };

        assert_eq!(config.normalized_server_url(), "http://example.com/api/");

        config.server_url = "http://example.com/api/".to_string();
        assert_eq!(config.normalized_server_url(), "http://example.com/api/");
    }
}
