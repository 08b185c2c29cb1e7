use config::{Config, ConfigError, Environment};
use lazy_static::lazy_static;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_max_connections")]
    pub database_pool_max_connections: u32,
    //ai
    #[serde(default)]
    pub ai_endpoint: String,
    #[serde(default = "default_ai_provider")]
    pub ai_provider: String,
    #[serde(default)]
    pub ai_model: String,
    #[serde(default)]
    pub ai_key: String,
    #[serde(default = "default_scoring_timeout_secs")]
    pub scoring_timeout_secs: u64,
    //ledger
    #[serde(default = "default_append_latency_ms")]
    pub ledger_append_latency_ms: u64,
    #[serde(default = "default_lookup_latency_ms")]
    pub ledger_lookup_latency_ms: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_flow_idle_secs")]
    pub flow_idle_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}

fn default_service_name() -> String {
    "hiretrust".into()
}

fn default_listen_port() -> String {
    "3000".into()
}

fn default_database_url() -> String {
    "sqlite://hiretrust.db?mode=rwc".into()
}

fn default_pool_max_connections() -> u32 {
    5
}

fn default_ai_provider() -> String {
    "gemini".into()
}

fn default_scoring_timeout_secs() -> u64 {
    60
}

fn default_append_latency_ms() -> u64 {
    2000
}

fn default_lookup_latency_ms() -> u64 {
    1500
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_flow_idle_secs() -> u64 {
    60 * 60
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let conf = Config::builder()
            .add_source(Environment::default())
            .build()?;
        let mut s: Settings = conf.try_deserialize()?;
        s.apply_provider_presets();
        Ok(s)
    }

    fn apply_provider_presets(&mut self) {
        let (endpoint, model) = match self.ai_provider.as_str() {
            "ollama" => {
                if self.ai_key.is_empty() {
                    self.ai_key = "ollama".into();
                }
                ("http://localhost:11434/v1", "gemma3:12b")
            }
            "openai" => ("https://api.openai.com/v1", "gpt-4o-mini"),
            "gemini" => (
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-2.5-flash",
            ),
            _ => return,
        };
        if self.ai_endpoint.is_empty() {
            self.ai_endpoint = endpoint.into();
        }
        if self.ai_model.is_empty() {
            self.ai_model = model.into();
        }
    }
}

lazy_static! {
    pub static ref settings: Settings = Settings::new().expect("improperly configured");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_presets(value: serde_json::Value) -> Settings {
        let mut s: Settings = serde_json::from_value(value).unwrap();
        s.apply_provider_presets();
        s
    }

    fn bare(provider: &str) -> Settings {
        with_presets(serde_json::json!({ "ai_provider": provider }))
    }

    #[test]
    fn test_defaults_without_environment() {
        let s = bare("gemini");
        assert_eq!(s.listen_port, "3000");
        assert_eq!(s.ledger_append_latency_ms, 2000);
        assert_eq!(s.ledger_lookup_latency_ms, 1500);
        assert_eq!(s.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(s.flow_idle_secs, 3600);
        assert_eq!(s.ai_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_ollama_preset_fills_key() {
        let s = bare("ollama");
        assert_eq!(s.ai_key, "ollama");
        assert_eq!(s.ai_endpoint, "http://localhost:11434/v1");
    }

    #[test]
    fn test_unknown_provider_left_alone() {
        let s = bare("custom");
        assert!(s.ai_endpoint.is_empty());
        assert!(s.ai_model.is_empty());
    }

    #[test]
    fn test_explicit_endpoint_and_key_survive_presets() {
        let s = with_presets(serde_json::json!({
            "ai_provider": "ollama",
            "ai_endpoint": "http://proxy.internal/v1",
            "ai_key": "k"
        }));
        assert_eq!(s.ai_endpoint, "http://proxy.internal/v1");
        assert_eq!(s.ai_key, "k");
        assert_eq!(s.ai_model, "gemma3:12b");

        let s = with_presets(serde_json::json!({
            "ai_provider": "openai",
            "ai_model": "gpt-4.1"
        }));
        assert_eq!(s.ai_endpoint, "https://api.openai.com/v1");
        assert_eq!(s.ai_model, "gpt-4.1");
    }
}
