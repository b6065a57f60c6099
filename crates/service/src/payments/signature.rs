//! `x-signature` verification for Mercado Pago notifications.
//!
//! The header looks like `ts=1704908010,v1=618c8534...`; `v1` is the hex HMAC-SHA256 of
//! the manifest `id:{data.id};request-id:{x-request-id};ts:{ts};` keyed by the webhook secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// `(ts, v1)` from the header; unknown keys are ignored.
pub fn parse_header(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", v)) => ts = Some(v.trim()),
            Some(("v1", v)) => v1 = Some(v.trim()),
            _ => {}
        }
    }
    Some((ts?, v1?))
}

pub fn manifest(data_id: &str, request_id: &str, ts: &str) -> String {
    format!("id:{};request-id:{};ts:{};", data_id.to_lowercase(), request_id, ts)
}

fn mac_for(secret: &str, manifest: &str) -> Result<HmacSha256, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::validation("invalid webhook secret"))?;
    mac.update(manifest.as_bytes());
    Ok(mac)
}

/// Hex signature for a notification; the counterpart of [`verify`].
pub fn sign(secret: &str, data_id: &str, request_id: &str, ts: &str) -> Result<String, ServiceError> {
    let mac = mac_for(secret, &manifest(data_id, request_id, ts))?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of the `x-signature` header.
pub fn verify(secret: &str, header: &str, data_id: &str, request_id: &str) -> Result<(), ServiceError> {
    let (ts, v1) = parse_header(header).ok_or(ServiceError::Unauthorized)?;
    let expected = hex::decode(v1).map_err(|_| ServiceError::Unauthorized)?;
    mac_for(secret, &manifest(data_id, request_id, ts))?
        .verify_slice(&expected)
        .map_err(|_| ServiceError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec-test-123";

    #[test]
    fn header_parsing_tolerates_spacing_and_order() {
        assert_eq!(parse_header("ts=1,v1=ab"), Some(("1", "ab")));
        assert_eq!(parse_header(" v1=ab , ts=1 "), Some(("1", "ab")));
        assert_eq!(parse_header("ts=1"), None);
        assert_eq!(parse_header(""), None);
    }

    #[test]
    fn manifest_format() {
        assert_eq!(manifest("ABC123", "req-1", "1704908010"), "id:abc123;request-id:req-1;ts:1704908010;");
    }

    #[test]
    fn valid_signature_verifies() {
        let v1 = sign(SECRET, "123456", "req-1", "1704908010").unwrap();
        let header = format!("ts=1704908010,v1={v1}");
        assert!(verify(SECRET, &header, "123456", "req-1").is_ok());
    }

    #[test]
    fn tampering_is_rejected() {
        let v1 = sign(SECRET, "123456", "req-1", "1704908010").unwrap();
        let header = format!("ts=1704908010,v1={v1}");
        assert!(verify(SECRET, &header, "999999", "req-1").is_err());
        assert!(verify(SECRET, &header, "123456", "req-2").is_err());
        assert!(verify("other-secret", &header, "123456", "req-1").is_err());
        let header = format!("ts=1704908011,v1={v1}");
        assert!(verify(SECRET, &header, "123456", "req-1").is_err());
        assert!(verify(SECRET, "ts=1,v1=not-hex", "123456", "req-1").is_err());
    }
}
