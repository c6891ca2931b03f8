//! Configuration types for the Kaiheila adapter.
//!
//! The schema is loaded by the host runtime from its configuration file,
//! under `adapters.kaiheila`.
//!
//! # Example Configuration
//!
//! ```yaml
//! adapters:
//!   kaiheila:
//!     bots:
//!       - client_id: 3aQbyZtBnMqNvMjf
//!         token: ${KAIHEILA_TOKEN}
//!         client_secret: ${KAIHEILA_SECRET:-}
//!     api_base: https://www.kaiheila.cn/api/v3
//!     upload_timeout_secs: 30
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://www.kaiheila.cn/api/v3";

/// Kaiheila adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KaiheilaConfig {
    /// Bot credentials, one entry per bot.
    pub bots: Vec<BotConfig>,

    /// Base URL of the REST API.
    pub api_base: String,

    /// Timeout for asset uploads in seconds.
    pub upload_timeout_secs: u64,
}

impl Default for KaiheilaConfig {
    fn default() -> Self {
        Self {
            bots: Vec::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_timeout_secs: 30,
        }
    }
}

impl KaiheilaConfig {
    /// Returns the bot with the given client id.
    pub fn bot(&self, client_id: &str) -> Option<&BotConfig> {
        self.bots.iter().find(|bot| bot.client_id == client_id)
    }

    /// Returns true if no bot is configured.
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// The upload timeout as a [`Duration`].
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Credentials of a single bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    pub client_id: String,
    /// Bot token, sent as `Authorization: Bot <token>`.
    pub token: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
bots:
  - client_id: alpha
    token: t-alpha
    client_secret: s-alpha
  - client_id: beta
    token: t-beta
upload_timeout_secs: 10
"#;

        let config: KaiheilaConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bots.len(), 2);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.upload_timeout(), Duration::from_secs(10));

        let beta = config.bot("beta").unwrap();
        assert_eq!(beta.token, "t-beta");
        assert_eq!(beta.client_secret, None);
        assert_eq!(
            config.bot("alpha").and_then(|b| b.client_secret.as_deref()),
            Some("s-alpha")
        );
        assert!(config.bot("gamma").is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: KaiheilaConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.is_empty());
        assert_eq!(config.api_base, "https://www.kaiheila.cn/api/v3");
        assert_eq!(config.upload_timeout_secs, 30);
    }

    #[test]
    fn test_bot_requires_token() {
        let yaml = "bots:\n  - client_id: alpha\n";
        assert!(serde_yaml::from_str::<KaiheilaConfig>(yaml).is_err());
    }
}
