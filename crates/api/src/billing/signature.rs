//! Verification of the `Stripe-Signature` header.
//!
//! The header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`. Each `v1` is
//! an HMAC-SHA256 of `"{t}.{payload}"` under the webhook secret; any one
//! matching signature is accepted.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,
    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,
    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mac = signed_mac(payload, secret, timestamp);
    format!("{:x}", mac.finalize().into_bytes())
}

/// Check `header` against `payload`.
///
/// The signature is checked before the timestamp, so a forged request
/// always reports [`SignatureError::NoMatchingSignature`].
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mac = signed_mac(payload, secret, timestamp);
    let matched = signatures.iter().any(|candidate| {
        decode_hex(candidate).is_some_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(SignatureError::NoMatchingSignature);
    }

    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutsideTolerance);
    }
    Ok(())
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: i64) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &[u8] = br#"{"type":"ping"}"#;
    const NOW: i64 = 1_700_000_000;

    fn header_for(timestamp: i64, secret: &str) -> String {
        format!("t={timestamp},v1={}", compute_signature(PAYLOAD, secret, timestamp))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let header = header_for(NOW, SECRET);
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let header = format!("t={NOW},v1=deadbeef,{}", &header_for(NOW, SECRET)[13..]);
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = header_for(NOW, "whsec_other");
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = header_for(NOW, SECRET);
        assert_eq!(
            verify_signature(br#"{"type":"pong"}"#, &header, SECRET, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = header_for(NOW - 301, SECRET);
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, 300, NOW),
            Err(SignatureError::TimestampOutsideTolerance)
        );
    }

    #[test]
    fn header_without_timestamp_is_malformed() {
        assert_eq!(
            verify_signature(PAYLOAD, "v1=abcd", SECRET, 300, NOW),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(PAYLOAD, "t=123", SECRET, 300, NOW),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn hex_decoding() {
        assert_eq!(decode_hex("00ff10"), Some(vec![0x00, 0xff, 0x10]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
    }
}
