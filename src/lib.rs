//! Bearer-token authorization check.
//!
//! [`validate_token`] takes an `Authorization` header value, a [`KeyResolver`] and a
//! [`Validations`] policy. It verifies the JWT signature and built-in time claims, then checks
//! issuer, audience and scopes, returning the claim set or a classified [`ValidationError`].
//!
//! [`make_key_resolver`] builds a resolver from a remote JWK set refreshed in the background.
pub mod config;
pub mod services;

pub use services::auth::{
    ClaimRuleError, ClaimSet, ClaimsValidator, InvalidTokenError, JwksError, JwksKeyResolver,
    KeyResolveError, KeyResolver, ParseError, StaticKeyResolver, ValidationError, Validations,
    make_key_resolver, validate_token,
};
