use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which generator backend sessions talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorBackend {
    /// Remote generation service at this base URL.
    Remote(String),
    /// Claude, called directly with this API key.
    Anthropic(String),
}

/// Application configuration loaded from environment variables.
/// Startup fails if no generator backend is configured.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub anthropic_api_key: Option<String>,
    pub generation_service_url: Option<String>,
    /// Without it every import reports the profile source as unavailable.
    pub identity_service_url: Option<String>,
    pub generation_timeout: Duration,
    pub identity_timeout: Duration,
    /// Sessions with no document change for this long are dropped.
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match optional(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a whole number of seconds")),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let config = Config {
            port: optional("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            anthropic_api_key: optional("ANTHROPIC_API_KEY"),
            generation_service_url: optional("GENERATION_SERVICE_URL"),
            identity_service_url: optional("IDENTITY_SERVICE_URL"),
            generation_timeout: seconds("GENERATION_TIMEOUT_SECS", 20)?,
            identity_timeout: seconds("IDENTITY_TIMEOUT_SECS", 10)?,
            session_idle: seconds("SESSION_IDLE_SECS", 3600)?,
        };

        if config.generator_backend().is_none() {
            bail!("Set GENERATION_SERVICE_URL or ANTHROPIC_API_KEY to configure a generator backend");
        }
        Ok(config)
    }

    /// The remote service wins when both backends are configured.
    pub fn generator_backend(&self) -> Option<GeneratorBackend> {
        self.generation_service_url
            .clone()
            .map(GeneratorBackend::Remote)
            .or_else(|| {
                self.anthropic_api_key
                    .clone()
                    .map(GeneratorBackend::Anthropic)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.generation_timeout, Duration::from_secs(20));
        assert_eq!(config.identity_timeout, Duration::from_secs(10));
        assert_eq!(config.session_idle, Duration::from_secs(3600));
        assert!(config.identity_service_url.is_none());
        assert_eq!(
            config.generator_backend(),
            Some(GeneratorBackend::Anthropic("sk-test".into()))
        );
    }

    #[test]
    fn test_remote_backend_wins() {
        let config = load(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("GENERATION_SERVICE_URL", "http://gen:8000"),
        ])
        .unwrap();
        assert_eq!(
            config.generator_backend(),
            Some(GeneratorBackend::Remote("http://gen:8000".into()))
        );
    }

    #[test]
    fn test_missing_backend_is_an_error() {
        assert!(load(&[("PORT", "9000")]).is_err());
        assert!(load(&[("ANTHROPIC_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let err = load(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("GENERATION_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("GENERATION_TIMEOUT_SECS"));
    }
}
