//! Error taxonomy for bearer-token validation.
//!
//! Callers map these to transport responses (401/403 etc.); the validator only classifies.
use thiserror::Error;

use crate::services::auth::claims::ClaimSet;

/// Top-level validation failure.
///
/// Only `ClaimsInvalid` carries the parsed claims: the signature and the token's own
/// validity checks passed, so the caller may inspect what was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("error parsing token: {0}")]
    ParsingFailed(#[source] ParseError),

    #[error("parsed token is invalid: {0}")]
    TokenInvalid(#[source] InvalidTokenError),

    #[error("invalid claims: {rule}")]
    ClaimsInvalid {
        #[source]
        rule: ClaimRuleError,
        claims: ClaimSet,
    },
}

impl ValidationError {
    /// Claims rejected by a policy rule, if this is a rule failure.
    pub fn claims(&self) -> Option<&ClaimSet> {
        match self {
            Self::ClaimsInvalid { claims, .. } => Some(claims),
            _ => None,
        }
    }

    /// Owned variant of [`claims`](Self::claims).
    pub fn into_claims(self) -> Option<ClaimSet> {
        match self {
            Self::ClaimsInvalid { claims, .. } => Some(claims),
            _ => None,
        }
    }

    /// The policy rule that failed, if this is a rule failure.
    pub fn rule(&self) -> Option<ClaimRuleError> {
        match self {
            Self::ClaimsInvalid { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

impl From<ParseError> for ValidationError {
    fn from(e: ParseError) -> Self {
        Self::ParsingFailed(e)
    }
}

impl From<InvalidTokenError> for ValidationError {
    fn from(e: InvalidTokenError) -> Self {
        Self::TokenInvalid(e)
    }
}

/// The credential could not be parsed or its signature could not be verified.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("authorization header has no scheme separator")]
    MalformedHeader,

    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] KeyResolveError),

    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Signature is fine but the token fails its own built-in checks.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTokenError {
    #[error("token is expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token used before issued")]
    IssuedInFuture,
    #[error("token payload is not a claim mapping")]
    MalformedClaims,
}

/// Policy rule that rejected an otherwise valid token.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRuleError {
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("invalid scopes")]
    InvalidScopes,
}

/// Returned by a `KeyResolver` when no verification key can be produced.
///
/// Resolvers must fail closed: an unknown identifier is an error, never a guessed key.
#[derive(Debug, Error)]
pub enum KeyResolveError {
    #[error("no verification keys available")]
    NoKeys,
    #[error("token kid is required when multiple keys are present")]
    MissingKeyId,
    #[error("no key found for kid: {0}")]
    UnknownKeyId(String),
    #[error("unusable verification key: {0}")]
    InvalidKey(String),
    #[error("{0}")]
    Other(String),
}
