/*
 * Responsibility
 * - 環境変数 (.env) から検証ポリシーと鍵の取得元を読み込む
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use thiserror::Error;

use crate::services::auth::Validations;

pub const DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Where verification keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Jwks {
        url: String,
        refresh_interval_seconds: u64,
    },
    // Single Ed25519 public key, PEM encoded
    StaticPem(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_issuer: String,
    pub auth_issuer_required: bool,
    pub auth_needed_scopes: Vec<String>,

    // Setting an audience allows it.
    pub internal_audience: Option<String>,
    pub external_audience: Option<String>,

    pub key_source: KeySource,
    pub access_token_leeway_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_issuer = lookup("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_issuer_required = match lookup("AUTH_ISSUER_REQUIRED") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_ISSUER_REQUIRED"))?,
            None => true,
        };

        let auth_needed_scopes = lookup("AUTH_NEEDED_SCOPES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let internal_audience = non_empty(lookup("AUTH_INTERNAL_AUDIENCE"));
        let external_audience = non_empty(lookup("AUTH_EXTERNAL_AUDIENCE"));

        let key_source = match non_empty(lookup("JWKS_URL")) {
            Some(url) => {
                url::Url::parse(&url).map_err(|_| ConfigError::Invalid("JWKS_URL"))?;

                let refresh_interval_seconds = match lookup("JWKS_REFRESH_INTERVAL_SECONDS") {
                    Some(v) => v
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::Invalid("JWKS_REFRESH_INTERVAL_SECONDS"))?,
                    None => DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS,
                };

                KeySource::Jwks {
                    url,
                    refresh_interval_seconds,
                }
            }
            None => {
                let pem = non_empty(lookup("ACCESS_JWT_PUBLIC_KEY_PEM"))
                    .ok_or(ConfigError::Missing("JWKS_URL or ACCESS_JWT_PUBLIC_KEY_PEM"))?
                    .replace("\\n", "\n");
                KeySource::StaticPem(pem)
            }
        };

        let access_token_leeway_seconds = match lookup("ACCESS_TOKEN_LEEWAY_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("ACCESS_TOKEN_LEEWAY_SECONDS"))?,
            None => 0,
        };

        Ok(Self {
            auth_issuer,
            auth_issuer_required,
            auth_needed_scopes,
            internal_audience,
            external_audience,
            key_source,
            access_token_leeway_seconds,
        })
    }

    pub fn policy(&self) -> Validations {
        Validations {
            issuer: self.auth_issuer.clone(),
            issuer_required: self.auth_issuer_required,
            needed_scopes: self.auth_needed_scopes.clone(),
            internal_audience_allowed: self.internal_audience.is_some(),
            internal_audience: self.internal_audience.clone().unwrap_or_default(),
            external_audience_allowed: self.external_audience.is_some(),
            external_audience: self.external_audience.clone().unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn jwks_source_with_defaults() {
        let config = load(&[
            ("AUTH_ISSUER", "issuer.example.com"),
            ("AUTH_EXTERNAL_AUDIENCE", "ext.example.com"),
            ("AUTH_NEEDED_SCOPES", "orders:read, orders:write,,"),
            ("JWKS_URL", "https://issuer.example.com/.well-known/jwks.json"),
        ])
        .unwrap();

        assert!(config.auth_issuer_required);
        assert_eq!(config.access_token_leeway_seconds, 0);
        assert_eq!(
            config.key_source,
            KeySource::Jwks {
                url: "https://issuer.example.com/.well-known/jwks.json".into(),
                refresh_interval_seconds: DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS,
            }
        );

        let policy = config.policy();
        assert_eq!(policy.issuer, "issuer.example.com");
        assert!(policy.external_audience_allowed);
        assert!(!policy.internal_audience_allowed);
        assert_eq!(policy.needed_scopes, vec!["orders:read", "orders:write"]);
    }

    #[test]
    fn pem_source_expands_escaped_newlines() {
        let config = load(&[
            ("AUTH_ISSUER", "iss"),
            ("AUTH_ISSUER_REQUIRED", "false"),
            ("ACCESS_JWT_PUBLIC_KEY_PEM", "-----BEGIN-----\\nabc\\n-----END-----"),
        ])
        .unwrap();

        assert!(!config.auth_issuer_required);
        assert_eq!(
            config.key_source,
            KeySource::StaticPem("-----BEGIN-----\nabc\n-----END-----".into())
        );
    }

    #[test]
    fn reports_missing_and_invalid_values() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("AUTH_ISSUER"));
        assert_eq!(
            load(&[("AUTH_ISSUER", "iss")]).unwrap_err(),
            ConfigError::Missing("JWKS_URL or ACCESS_JWT_PUBLIC_KEY_PEM")
        );
        assert_eq!(
            load(&[("AUTH_ISSUER", "iss"), ("JWKS_URL", "nope")]).unwrap_err(),
            ConfigError::Invalid("JWKS_URL")
        );
        assert_eq!(
            load(&[
                ("AUTH_ISSUER", "iss"),
                ("JWKS_URL", "https://x.example.com/jwks"),
                ("JWKS_REFRESH_INTERVAL_SECONDS", "soon"),
            ])
            .unwrap_err(),
            ConfigError::Invalid("JWKS_REFRESH_INTERVAL_SECONDS")
        );
        assert_eq!(
            load(&[
                ("AUTH_ISSUER", "iss"),
                ("AUTH_ISSUER_REQUIRED", "maybe"),
                ("JWKS_URL", "https://x.example.com/jwks"),
            ])
            .unwrap_err(),
            ConfigError::Invalid("AUTH_ISSUER_REQUIRED")
        );
    }
}
