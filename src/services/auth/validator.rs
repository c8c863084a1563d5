use jsonwebtoken::{Validation, errors::ErrorKind};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::services::auth::claims::ClaimSet;
use crate::services::auth::error::{
    ClaimRuleError, InvalidTokenError, ParseError, ValidationError,
};
use crate::services::auth::key_resolver::KeyResolver;
use crate::services::auth::policy::Validations;

const ISSUED_AT: &str = "iat";

/// Validate an `Authorization` header value against `policy` with default options.
///
/// See [`ClaimsValidator::validate`].
pub fn validate_token(
    raw_header_value: &str,
    key_resolver: &dyn KeyResolver,
    policy: &Validations,
) -> Result<ClaimSet, ValidationError> {
    ClaimsValidator::default().validate(raw_header_value, key_resolver, policy)
}

/// Bearer-token check: signature, built-in time claims, then the caller's policy.
///
/// Stateless and re-entrant; one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ClaimsValidator {
    leeway_seconds: u64,
}

impl ClaimsValidator {
    /// `leeway_seconds` is the clock skew tolerated for `exp`, `nbf` and `iat`.
    pub fn new(leeway_seconds: u64) -> Self {
        Self { leeway_seconds }
    }

    pub fn leeway_seconds(&self) -> u64 {
        self.leeway_seconds
    }

    /// Verify `raw_header_value` (`"<scheme> <token>"`) and evaluate its claims.
    ///
    /// Steps, first failure wins:
    /// 1. split at the first space; the scheme is ignored
    /// 2. resolve the key and verify the signature (`ParsingFailed`)
    /// 3. `exp` / `nbf` / `iat` and payload shape (`TokenInvalid`)
    /// 4. issuer, audience, scope rules (`ClaimsInvalid`, carrying the claims)
    pub fn validate(
        &self,
        raw_header_value: &str,
        key_resolver: &dyn KeyResolver,
        policy: &Validations,
    ) -> Result<ClaimSet, ValidationError> {
        let token = bearer_credential(raw_header_value)?;
        let claims = self.verify(token, key_resolver)?;

        if let Err(rule) = check_claims(&claims, policy) {
            return Err(ValidationError::ClaimsInvalid { rule, claims });
        }

        Ok(claims)
    }

    /// Signature + registered time claims; no policy evaluation.
    pub fn verify(
        &self,
        token: &str,
        key_resolver: &dyn KeyResolver,
    ) -> Result<ClaimSet, ValidationError> {
        let header = jsonwebtoken::decode_header(token).map_err(ParseError::Jwt)?;
        let key = key_resolver
            .resolve(&header)
            .map_err(ParseError::KeyResolution)?;

        // Audience is a policy rule here, not a jsonwebtoken check. No registered claim is
        // mandatory, but the ones present must hold.
        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data =
            jsonwebtoken::decode::<Value>(token, &key, &validation).map_err(classify_jwt_error)?;

        let Value::Object(claims) = data.claims else {
            return Err(InvalidTokenError::MalformedClaims.into());
        };
        self.check_issued_at(&claims)?;

        Ok(ClaimSet::new(claims))
    }

    fn check_issued_at(&self, claims: &Map<String, Value>) -> Result<(), InvalidTokenError> {
        let Some(iat) = claims.get(ISSUED_AT) else {
            return Ok(());
        };
        let iat = iat.as_f64().ok_or(InvalidTokenError::MalformedClaims)?;

        let now = chrono::Utc::now().timestamp();
        let latest = now.saturating_add(i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX));
        if iat > latest as f64 {
            return Err(InvalidTokenError::IssuedInFuture);
        }
        Ok(())
    }
}

// Everything after the first space is the credential.
fn bearer_credential(raw_header_value: &str) -> Result<&str, ParseError> {
    raw_header_value
        .split_once(' ')
        .map(|(_scheme, credential)| credential)
        .ok_or(ParseError::MalformedHeader)
}

fn classify_jwt_error(e: jsonwebtoken::errors::Error) -> ValidationError {
    match e.kind() {
        ErrorKind::ExpiredSignature => InvalidTokenError::Expired.into(),
        ErrorKind::ImmatureSignature => InvalidTokenError::NotYetValid.into(),
        // Only reachable once the signature checked out.
        ErrorKind::Json(_) | ErrorKind::InvalidClaimFormat(_) => {
            InvalidTokenError::MalformedClaims.into()
        }
        _ => ParseError::Jwt(e).into(),
    }
}

/// Evaluate the policy rules in order: issuer, audience, scopes.
pub fn check_claims(claims: &ClaimSet, policy: &Validations) -> Result<(), ClaimRuleError> {
    if !valid_issuer(claims, policy) {
        return Err(ClaimRuleError::InvalidIssuer);
    }
    if !valid_audience(claims, policy) {
        return Err(ClaimRuleError::InvalidAudience);
    }
    if !valid_scopes(&claims.scope_text(), &policy.needed_scopes) {
        return Err(ClaimRuleError::InvalidScopes);
    }
    Ok(())
}

fn valid_issuer(claims: &ClaimSet, policy: &Validations) -> bool {
    match claims.issuer() {
        Some(iss) => constant_time_eq(iss, &policy.issuer),
        None => !policy.issuer_required,
    }
}

// An audience that the policy does not allow never contributes a pass.
fn valid_audience(claims: &ClaimSet, policy: &Validations) -> bool {
    let valid_external = policy.external_audience_allowed
        && audience_matches(claims, &policy.external_audience);
    let valid_internal = policy.internal_audience_allowed
        && audience_matches(claims, &policy.internal_audience);

    valid_internal || valid_external
}

fn audience_matches(claims: &ClaimSet, expected: &str) -> bool {
    let Some(audiences) = claims.audiences() else {
        return false;
    };
    if audiences.iter().all(|aud| aud.is_empty()) {
        return false;
    }

    // No early exit, every entry is compared.
    audiences
        .iter()
        .fold(false, |found, aud| found | constant_time_eq(aud, expected))
}

/// Substring containment, not token membership: `"read"` is satisfied by `"readonly"`.
fn valid_scopes(scope: &str, needed_scopes: &[String]) -> bool {
    needed_scopes
        .iter()
        .all(|needed| scope.contains(needed.as_str()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
