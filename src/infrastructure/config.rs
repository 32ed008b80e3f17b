use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Invalid AUTH_TOKENS entry: {0:?} (expected token:user_uuid)")]
    InvalidAuthToken(String),
}

/// Process configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub search_service_url: String,
    pub generation_service_url: String,
    pub retrieval_timeout: Duration,
    pub token_timeout: Duration,
    pub retrieval_top_k: usize,
    pub http_max_retries: u32,
    pub ws_outbound_buffer: usize,
    pub auth_tokens: HashMap<String, Uuid>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_or(&read, "PORT", 3000)?,
            database_url: read("DATABASE_URL"),
            database_pool_size: parse_or(&read, "DATABASE_POOL_SIZE", 10)?,
            search_service_url: read("SEARCH_SERVICE_URL").ok_or(ConfigError::Missing {
                name: "SEARCH_SERVICE_URL",
            })?,
            generation_service_url: read("GENERATION_SERVICE_URL").ok_or(ConfigError::Missing {
                name: "GENERATION_SERVICE_URL",
            })?,
            retrieval_timeout: Duration::from_millis(parse_or(&read, "RETRIEVAL_TIMEOUT_MS", 10_000)?),
            token_timeout: Duration::from_millis(parse_or(&read, "TOKEN_TIMEOUT_MS", 30_000)?),
            retrieval_top_k: parse_or(&read, "RETRIEVAL_TOP_K", 8)?,
            http_max_retries: parse_or(&read, "HTTP_MAX_RETRIES", 2)?,
            ws_outbound_buffer: parse_or(&read, "WS_OUTBOUND_BUFFER", 256)?,
            auth_tokens: parse_auth_tokens(read("AUTH_TOKENS").as_deref().unwrap_or(""))?,
        })
    }
}

fn parse_or<T: FromStr>(
    read: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match read(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn parse_auth_tokens(raw: &str) -> Result<HashMap<String, Uuid>, ConfigError> {
    let mut tokens = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (token, user) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidAuthToken(entry.to_string()))?;
        let user_id = Uuid::parse_str(user.trim())
            .map_err(|_| ConfigError::InvalidAuthToken(entry.to_string()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::InvalidAuthToken(entry.to_string()));
        }
        tokens.insert(token.to_string(), user_id);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const BACKENDS: [(&str, &str); 2] = [
        ("SEARCH_SERVICE_URL", "http://search.local/search"),
        ("GENERATION_SERVICE_URL", "http://gen.local/generate"),
    ];

    #[test]
    fn test_defaults_apply() {
        let cfg = config(&BACKENDS).unwrap();
        assert_eq!(cfg.port, 3000);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.retrieval_timeout, Duration::from_secs(10));
        assert_eq!(cfg.token_timeout, Duration::from_secs(30));
        assert_eq!(cfg.retrieval_top_k, 8);
        assert_eq!(cfg.ws_outbound_buffer, 256);
        assert!(cfg.auth_tokens.is_empty());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let mut vars = BACKENDS.to_vec();
        vars.push(("RETRIEVAL_TIMEOUT_MS", "soon"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::InvalidValue {
                name: "RETRIEVAL_TIMEOUT_MS",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_backend_url() {
        assert!(matches!(
            config(&BACKENDS[..1]),
            Err(ConfigError::Missing {
                name: "GENERATION_SERVICE_URL"
            })
        ));
    }

    #[test]
    fn test_auth_tokens_parse() {
        let user = Uuid::new_v4();
        let entry = format!("alpha:{}, beta:{}", user, user);
        let mut vars = BACKENDS.to_vec();
        vars.push(("AUTH_TOKENS", entry.as_str()));

        let cfg = config(&vars).unwrap();
        assert_eq!(cfg.auth_tokens.get("alpha"), Some(&user));
        assert_eq!(cfg.auth_tokens.len(), 2);

        let mut bad = BACKENDS.to_vec();
        bad.push(("AUTH_TOKENS", "alpha"));
        assert!(matches!(config(&bad), Err(ConfigError::InvalidAuthToken(_))));
    }
}
