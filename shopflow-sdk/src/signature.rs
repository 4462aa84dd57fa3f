//! Signature algorithms and verification for every signed Shopflow surface.
//!
//! Two signing schemes exist, both HMAC-SHA256:
//!
//! * **Shopflow body signing** (fulfillment-partner shipment webhook):
//!
//!   ```text
//!   Shopflow-Signature: {unix_timestamp}.{base64_signature}
//!   ```
//!
//!   computed as `HMAC-SHA256("{timestamp}.{json_body}", secret)`.
//!
//! * **Processor event signing** (payment-processor webhook):
//!
//!   ```text
//!   Stripe-Signature: t={unix_timestamp},v1={hex_signature}[,v1=...]
//!   ```
//!
//!   computed as `HMAC-SHA256("{timestamp}.{raw_body}", webhook_secret)`.
//!   Several `v1` entries may be present while the processor rotates
//!   secrets; any one of them matching is sufficient.

use smallvec::SmallVec;

/// Header name for the Shopflow body signature.
pub const SIGNATURE_HEADER: &str = "Shopflow-Signature";

/// Header name the payment processor uses for event signatures.
pub const PROCESSOR_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum allowed age of a Shopflow body signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Default tolerance for processor event timestamps (in seconds).
pub const DEFAULT_PROCESSOR_TOLERANCE: i64 = 5 * 60;

/// Marker trait for types that can participate in body signing via
/// [`SignedObject`].
pub trait Signature: for<'de> serde::Deserialize<'de> + serde::Serialize {}

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid signature encoding")]
    InvalidEncoding,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

fn hmac_key(key: &[u8]) -> ring::hmac::Key {
    ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key)
}

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// ---------------------------------------------------------------------------
// SignedObject: Shopflow body signing
// ---------------------------------------------------------------------------

/// A signed API body carrying its typed payload, timestamp, raw JSON, and
/// HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject<T: Signature> {
    pub body: T,
    pub timestamp: i64,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: Signature> SignedObject<T> {
    /// Serialize `body`, sign `"{now}.{json}"` with `key`, and return the
    /// assembled object.
    pub fn new(body: T, key: &[u8]) -> Result<Self, serde_json::Error> {
        Self::new_at(body, key, now_unix())
    }

    /// Like [`new`](Self::new) but with an explicit timestamp.
    pub fn new_at(body: T, key: &[u8], timestamp: i64) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(&body)?;
        let data = format!("{timestamp}.{json}");
        let signature = ring::hmac::sign(&hmac_key(key), data.as_bytes());
        Ok(Self {
            body,
            timestamp,
            json,
            signature: signature.as_ref().to_owned().into_boxed_slice(),
        })
    }

    /// Reconstruct a [`SignedObject`] from a raw `Shopflow-Signature` header
    /// value and the JSON request body string.
    ///
    /// This parses the header and deserializes the body but does **not**
    /// verify the HMAC; call [`verify`](Self::verify) for that.
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let (timestamp, signature) = parse_signature_header(header_value)?;
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            timestamp,
            json: body_json,
            signature,
        })
    }

    /// Verify the HMAC signature and timestamp freshness, consuming `self`
    /// and returning the authenticated payload.
    pub fn verify(self, key: &[u8]) -> Result<T, SignatureError> {
        let data = format!("{}.{}", self.timestamp, self.json);
        ring::hmac::verify(&hmac_key(key), data.as_bytes(), self.signature.as_ref())?;
        check_timestamp(self.timestamp, now_unix(), MAX_SIGNATURE_AGE)?;
        Ok(self.body)
    }

    /// Format the full `Shopflow-Signature` header value (`{timestamp}.{b64}`).
    pub fn to_header(&self) -> String {
        format_signature_header(self.timestamp, &self.signature)
    }
}

/// Parse a `Shopflow-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let (timestamp, encoded) = value.split_once('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(encoded)
        .map_err(|_| SignatureError::InvalidEncoding)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Check that `timestamp` lies within `tolerance` seconds of `now`.
///
/// Timestamps from the future are held to the same window, so a sender
/// with a skewed clock cannot mint long-lived signatures.
pub fn check_timestamp(timestamp: i64, now: i64, tolerance: i64) -> Result<(), SignatureError> {
    if (now - timestamp).abs() > tolerance {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Processor event signing
// ---------------------------------------------------------------------------

/// A parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSignature {
    pub timestamp: i64,
    pub candidates: SmallVec<[Box<[u8]>; 2]>,
}

impl ProcessorSignature {
    /// Parse `t={ts},v1={hex}[,v1={hex}...]`.
    ///
    /// Unknown schemes (e.g. `v0`) are skipped. A header without a
    /// timestamp or without any `v1` entry is rejected.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut candidates = SmallVec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(SignatureError::InvalidFormat)?;
            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| SignatureError::InvalidFormat)?);
                }
                "v1" => {
                    let bytes = hex::decode(value).map_err(|_| SignatureError::InvalidEncoding)?;
                    candidates.push(bytes.into_boxed_slice());
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::InvalidFormat)?;
        if candidates.is_empty() {
            return Err(SignatureError::InvalidFormat);
        }
        Ok(Self {
            timestamp,
            candidates,
        })
    }

    /// Verify `payload` against the parsed signatures, then check that the
    /// timestamp lies within `tolerance` seconds of `now`.
    pub fn verify_at(
        &self,
        payload: &[u8],
        secret: &[u8],
        tolerance: i64,
        now: i64,
    ) -> Result<(), SignatureError> {
        let key = hmac_key(secret);
        let mut signed = Vec::with_capacity(payload.len() + 16);
        signed.extend_from_slice(self.timestamp.to_string().as_bytes());
        signed.push(b'.');
        signed.extend_from_slice(payload);

        let matched = self
            .candidates
            .iter()
            .any(|candidate| ring::hmac::verify(&key, &signed, candidate).is_ok());
        if !matched {
            return Err(SignatureError::SignatureMismatch);
        }
        check_timestamp(self.timestamp, now, tolerance)
    }
}

/// Verify a processor event body against its `Stripe-Signature` header
/// using the current clock.
pub fn verify_processor_event(
    header: &str,
    payload: &[u8],
    secret: &[u8],
    tolerance: i64,
) -> Result<(), SignatureError> {
    ProcessorSignature::parse(header)?.verify_at(payload, secret, tolerance, now_unix())
}

/// Produce a `Stripe-Signature` header value for `payload`.
///
/// The server never signs processor events; this exists for local
/// tooling and tests that need to replay deliveries.
pub fn sign_processor_event(payload: &[u8], secret: &[u8], timestamp: i64) -> String {
    let mut signed = Vec::with_capacity(payload.len() + 16);
    signed.extend_from_slice(timestamp.to_string().as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(payload);
    let tag = ring::hmac::sign(&hmac_key(secret), &signed);
    format!("t={timestamp},v1={}", hex::encode(tag.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Ping {
        order_number: String,
    }

    impl Signature for Ping {}

    const SECRET: &[u8] = b"whsec_test123secret456";
    const PAYLOAD: &[u8] = br#"{"type":"checkout.session.completed"}"#;

    #[test]
    fn test_processor_signature_roundtrip() {
        let now = 1_700_000_000;
        let header = sign_processor_event(PAYLOAD, SECRET, now);
        let parsed = ProcessorSignature::parse(&header).unwrap();
        assert_eq!(parsed.timestamp, now);
        assert!(parsed.verify_at(PAYLOAD, SECRET, 300, now + 10).is_ok());
    }

    #[test]
    fn test_processor_signature_wrong_secret() {
        let now = 1_700_000_000;
        let header = sign_processor_event(PAYLOAD, b"wrong_secret", now);
        let parsed = ProcessorSignature::parse(&header).unwrap();
        assert!(matches!(
            parsed.verify_at(PAYLOAD, SECRET, 300, now),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_processor_signature_modified_payload() {
        let now = 1_700_000_000;
        let header = sign_processor_event(PAYLOAD, SECRET, now);
        let parsed = ProcessorSignature::parse(&header).unwrap();
        let tampered = br#"{"type":"checkout.session.completed","hacked":true}"#;
        assert!(parsed.verify_at(tampered, SECRET, 300, now).is_err());
    }

    #[test]
    fn test_processor_signature_outside_tolerance() {
        let signed_at = 1_700_000_000;
        let header = sign_processor_event(PAYLOAD, SECRET, signed_at);
        let parsed = ProcessorSignature::parse(&header).unwrap();
        assert!(matches!(
            parsed.verify_at(PAYLOAD, SECRET, 300, signed_at + 600),
            Err(SignatureError::Expired)
        ));
        assert!(matches!(
            parsed.verify_at(PAYLOAD, SECRET, 300, signed_at - 600),
            Err(SignatureError::Expired)
        ));
    }

    #[test]
    fn test_processor_signature_accepts_any_rotated_secret() {
        let now = 1_700_000_000;
        let good = sign_processor_event(PAYLOAD, SECRET, now);
        let good_hex = good.split_once("v1=").unwrap().1;
        let header = format!("t={now},v1={},v1={good_hex},v0=ignored", "00".repeat(32));
        let parsed = ProcessorSignature::parse(&header).unwrap();
        assert_eq!(parsed.candidates.len(), 2);
        assert!(parsed.verify_at(PAYLOAD, SECRET, 300, now).is_ok());
    }

    #[test]
    fn test_processor_signature_malformed_headers() {
        assert!(ProcessorSignature::parse("garbage").is_err());
        assert!(ProcessorSignature::parse("v1=abcd").is_err());
        assert!(ProcessorSignature::parse("t=1234567890").is_err());
        assert!(matches!(
            ProcessorSignature::parse("t=1,v1=zz"),
            Err(SignatureError::InvalidEncoding)
        ));
    }

    #[test]
    fn test_signed_object_roundtrip() {
        let body = Ping {
            order_number: "SF-20260101-00001234".to_string(),
        };
        let signed = SignedObject::new(body.clone(), SECRET).unwrap();
        let header = signed.to_header();
        let parsed = SignedObject::<Ping>::from_header_and_body(&header, signed.json).unwrap();
        assert_eq!(parsed.verify(SECRET).unwrap(), body);
    }

    #[test]
    fn test_signed_object_rejects_stale_timestamp() {
        let body = Ping {
            order_number: "SF-20260101-00001234".to_string(),
        };
        let stale = now_unix() - MAX_SIGNATURE_AGE - 60;
        let signed = SignedObject::new_at(body, SECRET, stale).unwrap();
        let parsed =
            SignedObject::<Ping>::from_header_and_body(&signed.to_header(), signed.json).unwrap();
        assert!(matches!(parsed.verify(SECRET), Err(SignatureError::Expired)));
    }
}
