use serde::Deserialize;

/// Caller-supplied policy a token's claims are evaluated against.
///
/// - An audience only counts when its `*_allowed` flag is set.
/// - With both audience flags off, no token passes the audience rule.
/// - `needed_scopes` entries are matched as substrings of the `scope` claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Validations {
    pub issuer: String,
    pub issuer_required: bool,
    pub needed_scopes: Vec<String>,
    pub internal_audience_allowed: bool,
    pub internal_audience: String,
    pub external_audience_allowed: bool,
    pub external_audience: String,
}

impl Validations {
    /// Require `iss` to be present and equal to `issuer`.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self.issuer_required = true;
        self
    }

    pub fn with_internal_audience(mut self, audience: impl Into<String>) -> Self {
        self.internal_audience = audience.into();
        self.internal_audience_allowed = true;
        self
    }

    pub fn with_external_audience(mut self, audience: impl Into<String>) -> Self {
        self.external_audience = audience.into();
        self.external_audience_allowed = true;
        self
    }

    pub fn with_needed_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needed_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}
