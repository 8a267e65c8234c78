//! Configuration for the model executor.

use config::builder::DefaultState;
use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, Environment, File};
use rendezvous_common::{MessagingConfig, REQUEST_TOPIC, RESPONSE_TOPIC};
use serde::Deserialize;

/// Main configuration structure for the model executor.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Model version this executor stamps on every response.
    pub model_version: String,
    /// URL the request payload is POSTed to.
    pub model_endpoint: String,
    /// Timeout for a single model backend call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Subscription on the request topic. Defaults to one subscription per
    /// model version, so every version sees every request while replicas of
    /// the same version share the load.
    #[serde(default)]
    pub subscription: Option<String>,
}

// Default values
fn default_request_timeout() -> u64 {
    300
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (EXECUTOR__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            // Load from config.toml if exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (EXECUTOR__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("EXECUTOR")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder
            .set_default("executor.request_timeout_secs", default_request_timeout() as i64)?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.model_version.trim().is_empty() {
            return Err(ConfigError::Message(
                "executor.model_version must not be empty".to_string(),
            ));
        }
        if self.executor.model_endpoint.trim().is_empty() {
            return Err(ConfigError::Message(
                "executor.model_endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_topic(&self) -> String {
        self.messaging.topic_name(REQUEST_TOPIC)
    }

    pub fn response_topic(&self) -> String {
        self.messaging.topic_name(RESPONSE_TOPIC)
    }

    pub fn subscription(&self) -> String {
        match self.executor.subscription {
            Some(ref subscription) => subscription.clone(),
            None => self.messaging.subscription_name(&format!(
                "{}-{}",
                REQUEST_TOPIC, self.executor.model_version
            )),
        }
    }
}
