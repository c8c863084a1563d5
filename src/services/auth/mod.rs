pub mod claims;
pub mod error;
pub mod factory;
pub mod jwks;
pub mod key_resolver;
pub mod policy;
pub mod validator;

pub use claims::{ClaimSet, coerce_to_text};
pub use error::{ClaimRuleError, InvalidTokenError, KeyResolveError, ParseError, ValidationError};
pub use factory::{build_key_resolver, build_validator};
pub use jwks::{JwksError, JwksKeyResolver, RemoteJwks, make_key_resolver};
pub use key_resolver::{KeyResolver, StaticKeyResolver};
pub use policy::Validations;
pub use validator::{ClaimsValidator, check_claims, validate_token};
