/// Factory: build the key resolver and validator from application `Config`.
use thiserror::Error;

use crate::config::{Config, KeySource};
use crate::services::auth::{
    ClaimsValidator, KeyResolveError, KeyResolver, StaticKeyResolver,
    jwks::{JwksError, make_key_resolver},
};

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Jwks(#[from] JwksError),
    #[error(transparent)]
    Key(#[from] KeyResolveError),
}

/// Must run inside a tokio runtime: a JWKS source fetches keys and starts refreshing.
pub async fn build_key_resolver(config: &Config) -> Result<Box<dyn KeyResolver>, FactoryError> {
    let resolver: Box<dyn KeyResolver> = match &config.key_source {
        KeySource::Jwks {
            url,
            refresh_interval_seconds,
        } => Box::new(make_key_resolver(url, *refresh_interval_seconds).await?),
        KeySource::StaticPem(pem) => Box::new(StaticKeyResolver::from_ed_pem(pem)?),
    };

    Ok(resolver)
}

pub fn build_validator(config: &Config) -> ClaimsValidator {
    ClaimsValidator::new(config.access_token_leeway_seconds)
}
