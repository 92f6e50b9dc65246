//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default OpenAI agent model to use
fn default_openai_agent_model() -> String {
    "gpt-4.1".to_string()
}

/// Default sampling temperature for the agent model
fn default_openai_agent_temperature() -> f32 {
    0.7
}

/// Default reasoning effort for `o*` models
fn default_openai_agent_reasoning_effort() -> String {
    "medium".to_string()
}

/// Default max output tokens for OpenAI model
fn default_openai_max_tokens() -> u32 {
    65536
}

/// Default instruction for the bug assistant agent.
fn default_agent_instruction() -> String {
    prompts::AGENT_INSTRUCTION.to_string()
}

/// Default application name used for sessions created by the `/chat/` surface.
fn default_app_name() -> String {
    "bug-assistant".to_string()
}

/// Default demo user id for the per-request session variant.
fn default_demo_user_id() -> String {
    "demo_user".to_string()
}

/// Default HTTP bind host.
fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

/// Default HTTP bind port.
fn default_http_port() -> u16 {
    8080
}

/// Default database endpoint (`memory` selects the embedded engine).
fn default_db_endpoint() -> String {
    "memory".to_string()
}

/// Which session lifecycle the deployment runs.
///
/// The two variants are mutually exclusive designs; the router only mounts the
/// endpoint that belongs to the configured variant.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionLifecycle {
    /// The client manages the session id, and the session persists across
    /// turns (`POST /interact/`).
    #[default]
    Persistent,
    /// A fresh session is created per request and folded into memory after the
    /// turn completes (`POST /chat/`).
    PerRequest,
}

/// Configuration for the bug-assistant application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The inner configuration values (shared, cheap to clone).
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The configuration values, loaded from environment variables and an
/// optional TOML file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI agent model to use (`OPENAI_AGENT_MODEL`).
    #[serde(default = "default_openai_agent_model")]
    pub openai_agent_model: String,
    /// Sampling temperature for the agent model (`OPENAI_AGENT_TEMPERATURE`).
    /// Value between 0 and 2. Only applied to `gpt*` models.
    #[serde(default = "default_openai_agent_temperature")]
    pub openai_agent_temperature: f32,
    /// Reasoning effort for `o*` models (`OPENAI_AGENT_REASONING_EFFORT`).
    /// One of `low`, `medium`, `high`.
    #[serde(default = "default_openai_agent_reasoning_effort")]
    pub openai_agent_reasoning_effort: String,
    /// Max output tokens for OpenAI model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Optional custom agent instruction to override the default (`AGENT_INSTRUCTION`).
    #[serde(default = "default_agent_instruction")]
    pub agent_instruction: String,
    /// Session lifecycle variant for this deployment (`SESSION_LIFECYCLE`).
    #[serde(default)]
    pub session_lifecycle: SessionLifecycle,
    /// Application name for sessions created server-side (`APP_NAME`).
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Demo user id used by the per-request variant (`DEMO_USER_ID`).
    #[serde(default = "default_demo_user_id")]
    pub demo_user_id: String,
    /// HTTP bind host (`HTTP_HOST`).
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// HTTP bind port (`HTTP_PORT`).
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Database endpoint URL (`DB_ENDPOINT`); `memory` selects the embedded engine.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`); ignored for the embedded engine.
    #[serde(default)]
    pub db_username: String,
    /// Database password (`DB_PASSWORD`); ignored for the embedded engine.
    #[serde(default)]
    pub db_password: String,
    /// Ticket toolbox MCP endpoint (`TOOLBOX_ENDPOINT`); no ticket tools when unset.
    #[serde(default)]
    pub toolbox_endpoint: Option<String>,
    /// Extra headers to send to the toolbox endpoint (`TOOLBOX_HEADERS`).
    #[serde(default)]
    pub toolbox_headers: Vec<(String, String)>,
}

impl Config {
    /// Loads configuration from the environment and an optional file, then
    /// validates it.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("BUG_ASSISTANT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Range checks shared by `load` and tests.
    pub fn validate(&self) -> Res<()> {
        if self.openai_agent_temperature < 0.0 || self.openai_agent_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI agent temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if !matches!(self.openai_agent_reasoning_effort.as_str(), "low" | "medium" | "high") {
            return Err(anyhow::anyhow!("OpenAI reasoning effort must be one of: low, medium, high."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(mutate: impl FnOnce(&mut ConfigInner)) -> Config {
        let mut inner = ConfigInner {
            openai_api_key: "test_key".to_string(),
            openai_agent_model: default_openai_agent_model(),
            openai_agent_temperature: default_openai_agent_temperature(),
            openai_agent_reasoning_effort: default_openai_agent_reasoning_effort(),
            openai_max_tokens: default_openai_max_tokens(),
            agent_instruction: default_agent_instruction(),
            app_name: default_app_name(),
            demo_user_id: default_demo_user_id(),
            db_endpoint: default_db_endpoint(),
            ..Default::default()
        };

        mutate(&mut inner);

        Config { inner: Arc::new(inner) }
    }

    #[test]
    fn test_defaults_validate() {
        let config = test_config(|_| {});

        assert!(config.validate().is_ok());
        assert_eq!(config.session_lifecycle, SessionLifecycle::Persistent);
        assert_eq!(config.app_name, "bug-assistant");
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let config = test_config(|c| c.openai_agent_temperature = 3.0);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_max_tokens() {
        let config = test_config(|c| c.openai_max_tokens = 0);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_reasoning_effort() {
        let config = test_config(|c| c.openai_agent_reasoning_effort = "extreme".to_string());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lifecycle_deserializes_from_snake_case() {
        let lifecycle: SessionLifecycle = serde_json::from_str("\"per_request\"").unwrap();

        assert_eq!(lifecycle, SessionLifecycle::PerRequest);
    }
}
