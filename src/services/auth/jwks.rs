//! Key resolution backed by a remote JSON Web Key Set.
//!
//! The current key set lives in an `ArcSwap` snapshot: lookups load it without locking, and a
//! single background task replaces it every refresh interval. A failed refresh is logged and
//! the last good key set stays in place.
use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use jsonwebtoken::{
    DecodingKey, Header,
    jwk::{Jwk, JwkSet},
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, warn};
use url::Url;

use crate::services::auth::error::KeyResolveError;
use crate::services::auth::key_resolver::KeyResolver;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("invalid jwks url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("jwks request to {url} failed: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("jwks request to {url} returned {status}")]
    Status { url: Url, status: StatusCode },

    #[error("response from {url} is not a jwk set: {source}")]
    Decode {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

/// A JWK set fetched from `url`, plus the means to fetch it again.
pub struct RemoteJwks {
    url: Url,
    http: Client,
    keys: ArcSwap<JwkSet>,
}

impl std::fmt::Debug for RemoteJwks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteJwks")
            .field("url", &self.url.as_str())
            .field("keys", &self.keys.load().keys.len())
            .finish()
    }
}

impl RemoteJwks {
    /// Fetch the key set once. Fails if the first fetch fails.
    pub async fn fetch(url: Url, http: Client) -> Result<Self, JwksError> {
        let keys = fetch_jwks(&http, &url).await?;

        Ok(Self {
            url,
            http,
            keys: ArcSwap::from_pointee(keys),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Snapshot of the most recently fetched key set.
    pub fn keys(&self) -> Arc<JwkSet> {
        self.keys.load_full()
    }

    /// Fetch the key set again; on error the current snapshot is left untouched.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        let keys = fetch_jwks(&self.http, &self.url).await?;
        debug!(url = %self.url, keys = keys.keys.len(), "jwks refreshed");

        self.keys.store(Arc::new(keys));
        Ok(())
    }
}

impl KeyResolver for RemoteJwks {
    fn resolve(&self, header: &Header) -> Result<DecodingKey, KeyResolveError> {
        let keys = self.keys.load();
        let jwk = select_jwk(&keys, header.kid.as_deref())?;

        DecodingKey::from_jwk(jwk).map_err(|e| KeyResolveError::InvalidKey(e.to_string()))
    }
}

/// `KeyResolver` over a [`RemoteJwks`] that owns its background refresh task.
///
/// Dropping the resolver stops the refresh.
#[derive(Debug)]
pub struct JwksKeyResolver {
    jwks: Arc<RemoteJwks>,
    refresh_interval: Option<Duration>,
    refresher: Option<JoinHandle<()>>,
}

impl JwksKeyResolver {
    /// Start refreshing `jwks` every `refresh_interval`; `None` disables refresh.
    ///
    /// Must be called within a tokio runtime when an interval is given.
    pub fn new(jwks: Arc<RemoteJwks>, refresh_interval: Option<Duration>) -> Self {
        let refresher = refresh_interval.map(|every| spawn_refresh(Arc::clone(&jwks), every));

        Self {
            jwks,
            refresh_interval,
            refresher,
        }
    }

    pub fn jwks(&self) -> &Arc<RemoteJwks> {
        &self.jwks
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }
}

impl KeyResolver for JwksKeyResolver {
    fn resolve(&self, header: &Header) -> Result<DecodingKey, KeyResolveError> {
        self.jwks.resolve(header)
    }
}

impl Drop for JwksKeyResolver {
    fn drop(&mut self) {
        if let Some(task) = self.refresher.take() {
            task.abort();
        }
    }
}

/// Build a resolver from the key set at `jwks_url`, refreshed every `refresh_interval_secs`.
///
/// The initial fetch must succeed. `0` disables background refresh.
pub async fn make_key_resolver(
    jwks_url: &str,
    refresh_interval_secs: u64,
) -> Result<JwksKeyResolver, JwksError> {
    let http = Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(JwksError::Client)?;

    make_key_resolver_with_client(jwks_url, refresh_interval_secs, http).await
}

pub async fn make_key_resolver_with_client(
    jwks_url: &str,
    refresh_interval_secs: u64,
    http: Client,
) -> Result<JwksKeyResolver, JwksError> {
    let url = parse_jwks_url(jwks_url)?;

    let jwks = RemoteJwks::fetch(url, http).await.map_err(|e| {
        error!(error = %e, "failed to create jwks from resource at the given url");
        e
    })?;

    let refresh_interval =
        (refresh_interval_secs > 0).then(|| Duration::from_secs(refresh_interval_secs));

    Ok(JwksKeyResolver::new(Arc::new(jwks), refresh_interval))
}

pub fn parse_jwks_url(raw: &str) -> Result<Url, JwksError> {
    let invalid = |reason: String| JwksError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}

fn spawn_refresh(jwks: Arc<RemoteJwks>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First tick one interval from now; the initial fetch already happened.
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = jwks.refresh().await {
                warn!(
                    error = %e,
                    url = %jwks.url(),
                    "error refreshing jwks, keeping last good key set"
                );
            }
        }
    })
}

async fn fetch_jwks(http: &Client, url: &Url) -> Result<JwkSet, JwksError> {
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(|source| JwksError::Fetch {
            url: url.clone(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(JwksError::Status {
            url: url.clone(),
            status,
        });
    }

    let raw = resp
        .json::<RawJwkSet>()
        .await
        .map_err(|source| JwksError::Decode {
            url: url.clone(),
            source,
        })?;

    Ok(usable_keys(raw, url))
}

// Key set with entries left undecoded, so one unsupported key does not reject the rest.
#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<Value>,
}

fn usable_keys(raw: RawJwkSet, url: &Url) -> JwkSet {
    let keys = raw
        .keys
        .into_iter()
        .filter_map(|entry| {
            let kid = entry.get("kid").and_then(Value::as_str).map(str::to_string);
            match serde_json::from_value::<Jwk>(entry) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    warn!(url = %url, kid = ?kid, error = %e, "skipping unsupported jwk");
                    None
                }
            }
        })
        .collect();

    JwkSet { keys }
}

fn select_jwk<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk, KeyResolveError> {
    if jwks.keys.is_empty() {
        return Err(KeyResolveError::NoKeys);
    }

    if let Some(kid) = kid {
        return jwks
            .keys
            .iter()
            .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| KeyResolveError::UnknownKeyId(kid.to_string()));
    }

    match jwks.keys.as_slice() {
        [only] => Ok(only),
        _ => Err(KeyResolveError::MissingKeyId),
    }
}
