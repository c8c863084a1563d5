use jsonwebtoken::{DecodingKey, Header};

use crate::services::auth::error::KeyResolveError;

/// Looks up the verification key for a token, given its decoded header.
///
/// Called once per validation. Implementations must be deterministic with respect to the
/// header's `kid`/`alg` and must fail closed on identifiers they do not know.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, header: &Header) -> Result<DecodingKey, KeyResolveError>;
}

impl<F> KeyResolver for F
where
    F: Fn(&Header) -> Result<DecodingKey, KeyResolveError> + Send + Sync,
{
    fn resolve(&self, header: &Header) -> Result<DecodingKey, KeyResolveError> {
        self(header)
    }
}

/// Resolver that hands out one fixed key regardless of `kid`.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct StaticKeyResolver {
    key: DecodingKey,
}

impl std::fmt::Debug for StaticKeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeyResolver").finish_non_exhaustive()
    }
}

impl StaticKeyResolver {
    pub fn new(key: DecodingKey) -> Self {
        Self { key }
    }

    /// HMAC shared secret (HS256/384/512).
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret))
    }

    pub fn from_ed_pem(pem: &str) -> Result<Self, KeyResolveError> {
        DecodingKey::from_ed_pem(pem.as_bytes())
            .map(Self::new)
            .map_err(|e| KeyResolveError::InvalidKey(format!("invalid ed25519 public key pem: {}", e)))
    }

    pub fn from_rsa_pem(pem: &str) -> Result<Self, KeyResolveError> {
        DecodingKey::from_rsa_pem(pem.as_bytes())
            .map(Self::new)
            .map_err(|e| KeyResolveError::InvalidKey(format!("invalid rsa public key pem: {}", e)))
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(&self, _header: &Header) -> Result<DecodingKey, KeyResolveError> {
        Ok(self.key.clone())
    }
}
