//! Configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::compose::DraftConfig;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::mail::{DEFAULT_SENDER_NAME, SmtpConfig};

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything the service needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub draft: DraftConfig,
    pub smtp: SmtpConfig,
    /// Directory for daily-rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: get("AI_MAILER_HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "AI_MAILER_PORT", defaults.port)?,
            cors_origins: get("AI_MAILER_CORS_ORIGINS")
                .map(|v| split_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.cors_origins),
        };

        let backend = match get("AI_MAILER_LLM_BACKEND") {
            Some(v) => v.parse::<LlmBackend>()?,
            None => LlmBackend::Anthropic,
        };
        let api_key = get(backend.api_key_var())
            .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))?;
        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(api_key),
            model: get("AI_MAILER_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
        };

        let draft_defaults = DraftConfig::default();
        let draft = DraftConfig {
            temperature: parse_or(&get, "AI_MAILER_TEMPERATURE", draft_defaults.temperature)?,
            max_tokens: parse_or(&get, "AI_MAILER_MAX_TOKENS", draft_defaults.max_tokens)?,
        };
        if !(0.0..=2.0).contains(&draft.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "AI_MAILER_TEMPERATURE".to_string(),
                message: format!("{} is outside 0.0..=2.0", draft.temperature),
            });
        }

        let host = get("SMTP_HOST").ok_or_else(|| ConfigError::MissingEnvVar("SMTP_HOST".into()))?;
        let username = get("SMTP_USERNAME").unwrap_or_default();
        let from_address = get("SMTP_FROM_ADDRESS")
            .or_else(|| Some(username.clone()).filter(|u| !u.is_empty()))
            .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_FROM_ADDRESS".into()))?;
        let smtp = SmtpConfig {
            host,
            port: parse_or(&get, "SMTP_PORT", 587)?,
            username,
            password: SecretString::from(get("SMTP_PASSWORD").unwrap_or_default()),
            from_address,
            from_name: get("SMTP_FROM_NAME").unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
            tls: parse_bool_or(&get, "SMTP_TLS", true)?,
            timeout: Duration::from_secs(parse_or(&get, "SMTP_TIMEOUT_SECS", 30)?),
        };

        Ok(Self {
            server,
            llm,
            draft,
            smtp,
            log_dir: get("AI_MAILER_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{v}' is not a boolean"),
            }),
        },
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ("SMTP_HOST", "smtp.example.com"),
        ("SMTP_USERNAME", "bot@example.com"),
    ];

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load(MINIMAL).unwrap();

        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.llm.backend, LlmBackend::Anthropic);
        assert_eq!(config.llm.model, LlmBackend::Anthropic.default_model());
        assert_eq!(config.llm.api_key.expose_secret(), "sk-ant-test");
        assert_eq!(config.draft.max_tokens, 1000);
        assert!((config.draft.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.tls);
        assert_eq!(config.smtp.timeout, Duration::from_secs(30));
        assert_eq!(config.smtp.from_address, "bot@example.com");
        assert_eq!(config.smtp.from_name, DEFAULT_SENDER_NAME);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = MINIMAL.to_vec();
        pairs.extend([
            ("AI_MAILER_PORT", "9000"),
            ("AI_MAILER_CORS_ORIGINS", "https://a.test, https://b.test"),
            ("AI_MAILER_LLM_BACKEND", "openai"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("AI_MAILER_MODEL", "gpt-4o"),
            ("AI_MAILER_MAX_TOKENS", "500"),
            ("SMTP_PORT", "2525"),
            ("SMTP_TLS", "false"),
            ("SMTP_FROM_ADDRESS", "news@example.com"),
            ("SMTP_FROM_NAME", "Newsletter"),
            ("AI_MAILER_LOG_DIR", "/var/log/ai-mailer"),
        ]);
        let config = load(&pairs).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.server.cors_origins,
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
        assert_eq!(config.llm.backend, LlmBackend::OpenAi);
        assert_eq!(config.llm.api_key.expose_secret(), "sk-openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.draft.max_tokens, 500);
        assert_eq!(config.smtp.port, 2525);
        assert!(!config.smtp.tls);
        assert_eq!(config.smtp.from_address, "news@example.com");
        assert_eq!(config.smtp.from_name, "Newsletter");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/ai-mailer")));
    }

    #[test]
    fn missing_api_key_for_backend_is_an_error() {
        let err = load(&[
            ("AI_MAILER_LLM_BACKEND", "openai"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "bot@example.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn smtp_host_and_sender_are_required() {
        let err = load(&[("ANTHROPIC_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SMTP_HOST"));

        let err = load(&[("ANTHROPIC_API_KEY", "k"), ("SMTP_HOST", "smtp.example.com")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SMTP_FROM_ADDRESS"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("SMTP_PORT", "not-a-port"));
        let err = load(&pairs).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SMTP_PORT"));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("AI_MAILER_TEMPERATURE", "3.5"));
        assert!(load(&pairs).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("AI_MAILER_PORT", "  "));
        assert_eq!(load(&pairs).unwrap().server.port, 8080);
    }
}
