//! Structural and expiry checks for the three-segment bearer token

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

use crate::error::ApiError;

/// Outcome of inspecting a stored token against the clock.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenStatus {
    /// Expiry in Unix seconds
    Valid { exp: i64 },
    Expired { exp: i64 },
    Missing,
    Malformed,
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid { .. })
    }
}

/// URL-safe alphabet, lenient like a browser `atob`: padding optional,
/// non-canonical trailing bits accepted.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode one base64url segment.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, ApiError> {
    SEGMENT_ENGINE
        .decode(segment)
        .map_err(|_| ApiError::TokenMalformed)
}

fn segments(token: &str) -> Option<[&str; 3]> {
    let mut parts = token.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some([header, payload, signature])
}

/// Exactly three segments, each independently decodable.
pub fn is_well_formed(token: &str) -> bool {
    match segments(token) {
        Some(parts) => parts.iter().all(|p| decode_segment(p).is_ok()),
        None => false,
    }
}

/// Read the numeric `exp` claim (Unix seconds) from the payload segment.
pub fn expiry(token: &str) -> Result<i64, ApiError> {
    let [_, payload, _] = segments(token).ok_or(ApiError::TokenMalformed)?;
    let bytes = decode_segment(payload)?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| ApiError::TokenMalformed)?;

    match claims.get("exp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or(ApiError::TokenMalformed),
        _ => Err(ApiError::TokenMalformed),
    }
}

/// Classify `token` at `now_ms` (Unix milliseconds). Valid only while `now < exp * 1000`.
pub fn inspect(token: Option<&str>, now_ms: i64) -> TokenStatus {
    let Some(token) = token else {
        return TokenStatus::Missing;
    };

    if !is_well_formed(token) {
        return TokenStatus::Malformed;
    }

    match expiry(token) {
        Ok(exp) if now_ms < exp.saturating_mul(1000) => TokenStatus::Valid { exp },
        Ok(exp) => TokenStatus::Expired { exp },
        Err(_) => TokenStatus::Malformed,
    }
}

#[cfg(test)]
pub(crate) fn encode_token(claims: &Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(b"signature-bytes");
    format!("{}.{}.{}", header, payload, signature)
}
