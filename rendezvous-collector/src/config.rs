//! Configuration for the rendezvous collector.

use config::builder::DefaultState;
use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, Environment, File};
use rendezvous_common::{MessagingConfig, DEFAULT_SOCKET_DIR, RESPONSE_TOPIC};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Only responses from this model version are delivered to callers.
    pub active_model_version: String,
    /// Directory holding the per-request caller sockets.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: String,
    /// Subscription on the response topic.
    #[serde(default)]
    pub subscription: Option<String>,
}

fn default_socket_dir() -> String {
    DEFAULT_SOCKET_DIR.to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (COLLECTOR__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("COLLECTOR")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder
            .set_default("collector.socket_dir", default_socket_dir())?
            .build()?
            .try_deserialize()?;

        if config.collector.active_model_version.trim().is_empty() {
            return Err(ConfigError::Message(
                "collector.active_model_version must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn response_topic(&self) -> String {
        self.messaging.topic_name(RESPONSE_TOPIC)
    }

    pub fn subscription(&self) -> String {
        match self.collector.subscription {
            Some(ref subscription) => subscription.clone(),
            None => self.messaging.subscription_name(&format!(
                "{}-{}",
                RESPONSE_TOPIC, self.collector.active_model_version
            )),
        }
    }
}
