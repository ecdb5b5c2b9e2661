use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Credentials and endpoints of the payment provider
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub app_id: i64,
    /// Request-signing key
    pub key1: String,
    /// Callback-verification key
    pub key2: String,
    pub create_url: String,
    pub query_url: String,
    pub callback_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// How long an intent stays payable before it expires locally
    pub intent_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

fn default_currency() -> String {
    "VND".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of VENDO)
            // Eg.. `VENDO__SERVER__PORT=9090` would set the server port
            .add_source(config::Environment::with_prefix("VENDO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
