use std::time::Duration;

use larder_client::generation::{GatewayConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(yml_path: &str) -> anyhow::Result<Self> {
        let yml = std::fs::read_to_string(yml_path)?;
        let config = serde_yaml::from_str(&yml)?;
        Ok(config)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub tls: Option<TLSConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TLSConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Where and how to reach the model. The API key is not kept here; it comes
/// from `LLM_API_KEY` in the environment.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub model: String,
    pub referer: String,
    pub title: String,
    pub generation_timeout_secs: u64,
    pub image_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let defaults = GatewayConfig::new("");
        Self {
            api_base: DEFAULT_API_BASE.into(),
            model: DEFAULT_MODEL.into(),
            referer: defaults.referer,
            title: defaults.title,
            generation_timeout_secs: defaults.generation_timeout.as_secs(),
            image_timeout_secs: defaults.image_timeout.as_secs(),
        }
    }
}

impl LlmConfig {
    pub fn gateway_config(&self, api_key: impl Into<String>) -> GatewayConfig {
        GatewayConfig {
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            referer: self.referer.clone(),
            title: self.title.clone(),
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            image_timeout: Duration::from_secs(self.image_timeout_secs),
            ..GatewayConfig::new(api_key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_parses() {
        let config: Config =
            serde_yaml::from_str(include_str!("../config.example.yml")).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:3000");
        assert!(config.server.tls.is_none());
        assert_eq!(config.database.path, "data/history.db");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
    }

    #[test]
    fn llm_section_is_optional_and_partial() {
        let config: Config = serde_yaml::from_str(
            "server:\n  address: 127.0.0.1:8080\n  tls:\n    cert_path: c.pem\n    key_path: k.pem\ndatabase:\n  path: h.db\n",
        )
        .unwrap();
        assert_eq!(config.server.tls.unwrap().key_path, "k.pem");
        assert_eq!(config.llm.api_base, DEFAULT_API_BASE);

        let llm: LlmConfig = serde_yaml::from_str("model: my/model\nimage_timeout_secs: 5").unwrap();
        let gateway = llm.gateway_config("key");
        assert_eq!(gateway.model, "my/model");
        assert_eq!(gateway.api_key, "key");
        assert_eq!(gateway.image_timeout, Duration::from_secs(5));
        assert_eq!(gateway.generation_timeout, Duration::from_secs(60));
        assert_eq!(gateway.max_tokens, 4000);
    }
}
