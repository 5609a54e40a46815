//! # Canonical Bytes
//!
//! [`CanonicalBytes`] is the only input accepted by [`crate::sha256_digest`].
//! Audit events are hashed into a chain, so two processes serializing the
//! same event must produce identical bytes.
//!
//! ## Rules
//!
//! 1. Object keys are sorted (serde_json's default `Map` is ordered).
//! 2. Output is compact, with no whitespace between tokens.
//! 3. Floats are rejected. Detail payloads carry integers and strings.
//! 4. RFC 3339 strings are normalized to UTC, seconds precision, `Z` suffix.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced by canonical serialization. The inner buffer is private;
/// construct through [`CanonicalBytes::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Fails when the value contains a float or cannot be serialized.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = normalize(serde_json::to_value(obj)?)?;
        Ok(Self(serde_json::to_vec(&value)?))
    }

    /// Borrow the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn normalize(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                return Err(CanonicalizationError::FloatRejected(
                    n.as_f64().unwrap_or(f64::NAN),
                ));
            }
            Ok(Value::Number(n))
        }
        Value::String(s) => match chrono::DateTime::parse_from_rfc3339(&s) {
            Ok(dt) => Ok(Value::String(
                dt.with_timezone(&chrono::Utc)
                    .format("%Y-%m-%dT%H:%M:%SZ")
                    .to_string(),
            )),
            Err(_) => Ok(Value::String(s)),
        },
        Value::Array(items) => items
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k, normalize(v)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}
