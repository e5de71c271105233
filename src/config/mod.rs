use std::time::Duration;

use serde::Deserialize;

use crate::services::poll::PollConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API key sent on every request (SHORTCUT_API_KEY)
    pub api_key: String,

    /// Base URL of the service (SHORTCUT_API_URL)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Delay between status polls, in seconds (SHORTCUT_POLL_INTERVAL_SECS)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Optional bound on total polling time, in seconds (SHORTCUT_MAX_POLL_SECS)
    #[serde(default)]
    pub max_poll_secs: Option<u64>,

    /// Consecutive unparsable status responses tolerated before giving up
    /// (SHORTCUT_PROTOCOL_FAILURE_BUDGET)
    #[serde(default = "default_protocol_failure_budget")]
    pub protocol_failure_budget: u32,
}

fn default_api_url() -> String {
    "https://web2labs.com".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_protocol_failure_budget() -> u32 {
    5
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("SHORTCUT_").from_env()
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_duration: self.max_poll_secs.map(Duration::from_secs),
            protocol_failure_budget: self.protocol_failure_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config: ClientConfig = envy::prefixed("SHORTCUT_")
            .from_iter(vec![("SHORTCUT_API_KEY".to_string(), "k".to_string())])
            .unwrap();

        assert_eq!(config.api_key, "k");
        assert_eq!(config.api_url, "https://web2labs.com");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.max_poll_secs, None);
        assert_eq!(config.protocol_failure_budget, 5);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let result: Result<ClientConfig, _> =
            envy::prefixed("SHORTCUT_").from_iter(Vec::<(String, String)>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_poll_config_conversion() {
        let config: ClientConfig = envy::prefixed("SHORTCUT_")
            .from_iter(vec![
                ("SHORTCUT_API_KEY".to_string(), "k".to_string()),
                ("SHORTCUT_POLL_INTERVAL_SECS".to_string(), "2".to_string()),
                ("SHORTCUT_MAX_POLL_SECS".to_string(), "600".to_string()),
            ])
            .unwrap();

        let poll = config.poll_config();
        assert_eq!(poll.poll_interval, Duration::from_secs(2));
        assert_eq!(poll.max_duration, Some(Duration::from_secs(600)));
    }
}
