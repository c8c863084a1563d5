use serde::Serialize;
use serde_json::{Map, Number, Value};

pub const ISSUER: &str = "iss";
pub const AUDIENCE: &str = "aud";
pub const SCOPE: &str = "scope";

/// Decoded token payload.
///
/// Built fresh for every validation and never mutated by the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `iss` when it is a non-empty string.
    pub fn issuer(&self) -> Option<&str> {
        match self.0.get(ISSUER) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// `aud` as a list of strings.
    ///
    /// A single string becomes a one-element list and a missing (or non-list) claim an empty
    /// one. Returns `None` when `aud` is a list holding anything other than strings.
    pub fn audiences(&self) -> Option<Vec<&str>> {
        match self.0.get(AUDIENCE) {
            Some(Value::String(s)) => Some(vec![s.as_str()]),
            Some(Value::Array(items)) => items.iter().map(Value::as_str).collect(),
            _ => Some(Vec::new()),
        }
    }

    /// Textual form of a claim, see [`coerce_to_text`].
    pub fn claim_text(&self, name: &str) -> String {
        coerce_to_text(self.0.get(name))
    }

    pub fn scope_text(&self) -> String {
        self.claim_text(SCOPE)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Render an arbitrary claim value as text.
///
/// Scope matching is a substring test on this text, so the rendering is fixed:
///
/// | value            | text                     |
/// |------------------|--------------------------|
/// | missing / `null` | `<nil>`                  |
/// | string           | the string itself        |
/// | bool             | `true` / `false`         |
/// | number           | f64, see below (`1e+06`) |
/// | array            | `[a b c]`                |
/// | object           | `map[k1:v1 k2:v2]`       |
///
/// Numbers are printed as f64 with the shortest round-trip digits, in exponent form when the
/// decimal exponent is below -4 or at least 6. Object keys are sorted.
///
/// The conversion is lossy: `["a b"]` and `["a","b"]` both render as `[a b]`.
pub fn coerce_to_text(value: Option<&Value>) -> String {
    let mut out = String::new();
    match value {
        Some(v) => write_value(&mut out, v),
        None => out.push_str("<nil>"),
    }
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("<nil>"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push_str("map[");
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                write_value(out, &map[key.as_str()]);
            }
            out.push(']');
        }
    }
}

// Every number goes through f64, large integers included.
fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) => format_float(f),
        None => n.to_string(),
    }
}

// Shortest round-trip digits; exponent form when the decimal exponent is < -4 or >= 6.
fn format_float(f: f64) -> String {
    if f == 0.0 {
        let zero = if f.is_sign_negative() { "-0" } else { "0" };
        return zero.to_string();
    }

    let sci = format!("{:e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return f.to_string();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return f.to_string();
    };

    if exp < -4 || exp >= 6 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(v: Value) -> String {
        coerce_to_text(Some(&v))
    }

    #[test]
    fn strings_render_verbatim() {
        assert_eq!(text(json!("read write")), "read write");
        assert_eq!(text(json!("")), "");
    }

    #[test]
    fn missing_and_null_render_as_nil() {
        assert_eq!(coerce_to_text(None), "<nil>");
        assert_eq!(text(Value::Null), "<nil>");
    }

    #[test]
    fn numbers_follow_float_formatting() {
        assert_eq!(text(json!(1)), "1");
        assert_eq!(text(json!(-42)), "-42");
        assert_eq!(text(json!(1.5)), "1.5");
        assert_eq!(text(json!(123456)), "123456");
        assert_eq!(text(json!(1000000)), "1e+06");
        assert_eq!(text(json!(1234567)), "1.234567e+06");
        assert_eq!(text(json!(0.0001)), "0.0001");
        assert_eq!(text(json!(0.000015)), "1.5e-05");
        assert_eq!(text(json!(1e21)), "1e+21");
        assert_eq!(text(json!(0)), "0");
    }

    #[test]
    fn arrays_and_maps_use_bracket_form() {
        assert_eq!(text(json!(["a", "b"])), "[a b]");
        assert_eq!(text(json!(["a", 1, true, null])), "[a 1 true <nil>]");
        assert_eq!(text(json!([["x"], []])), "[[x] []]");
        assert_eq!(text(json!({"b": 2, "a": "x"})), "map[a:x b:2]");
        assert_eq!(text(json!({"k": ["v"]})), "map[k:[v]]");
    }

    #[test]
    fn audiences_accept_string_or_string_list() {
        let single = ClaimSet::new(json!({"aud": "one"}).as_object().unwrap().clone());
        assert_eq!(single.audiences(), Some(vec!["one"]));

        let many = ClaimSet::new(json!({"aud": ["one", "two"]}).as_object().unwrap().clone());
        assert_eq!(many.audiences(), Some(vec!["one", "two"]));

        let mixed = ClaimSet::new(json!({"aud": ["one", 2]}).as_object().unwrap().clone());
        assert_eq!(mixed.audiences(), None);

        let missing = ClaimSet::default();
        assert_eq!(missing.audiences(), Some(vec![]));
    }

    #[test]
    fn issuer_ignores_empty_and_non_string() {
        let empty = ClaimSet::new(json!({"iss": ""}).as_object().unwrap().clone());
        assert_eq!(empty.issuer(), None);

        let number = ClaimSet::new(json!({"iss": 7}).as_object().unwrap().clone());
        assert_eq!(number.issuer(), None);

        let ok = ClaimSet::new(json!({"iss": "me"}).as_object().unwrap().clone());
        assert_eq!(ok.issuer(), Some("me"));
    }
}
