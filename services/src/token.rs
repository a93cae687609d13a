//! Signed, expiring session tokens.
//!
//! The QR code shown by a teacher's device encodes exactly one thing: the
//! base64 payload produced by [`TokenCodec::issue`]. Verification is pure
//! (no database access) and fails closed: any payload that does not carry a
//! valid signature over its own fields is rejected before anything else
//! looks at it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Payload is not base64, not JSON, or carries a non-hex signature.
    #[error("Invalid format")]
    InvalidFormat,
    /// Signature valid but the validity window has passed.
    #[error("QR expired")]
    Expired,
    /// Signature does not match the payload fields.
    #[error("Invalid signature")]
    BadSignature,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    session_id: i64,
    /// Epoch milliseconds.
    expires_at: i64,
    /// Hex HMAC-SHA256 over `"{session_id}.{expires_at}"`.
    signature: String,
}

/// HMAC-based codec for session tokens. Cloneable so one instance can be
/// shared between the session service and the verification engine.
#[derive(Clone)]
pub struct TokenCodec {
    key: Vec<u8>,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(key: Vec<u8>, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.key).expect("HMAC key")
    }

    fn sign(&self, session_id: i64, expires_at: i64) -> String {
        let mut mac = self.mac();
        mac.update(format!("{session_id}.{expires_at}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Issues a fresh token for the session, valid for the codec's TTL.
    pub fn issue(&self, session_id: i64) -> String {
        let expires_at = (Utc::now() + self.ttl).timestamp_millis();
        let payload = Payload {
            session_id,
            expires_at,
            signature: self.sign(session_id, expires_at),
        };
        // Serializing a struct of primitives cannot fail.
        let json = serde_json::to_vec(&payload).expect("token payload json");
        BASE64.encode(json)
    }

    /// Checks a scanned payload and returns the session id it names.
    ///
    /// Signature is checked before expiry, in constant time, so a forged
    /// payload learns nothing from the error it gets back.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let bytes = BASE64
            .decode(token)
            .map_err(|_| TokenError::InvalidFormat)?;
        let payload: Payload =
            serde_json::from_slice(&bytes).map_err(|_| TokenError::InvalidFormat)?;
        let sig = hex::decode(&payload.signature).map_err(|_| TokenError::InvalidFormat)?;

        let mut mac = self.mac();
        mac.update(format!("{}.{}", payload.session_id, payload.expires_at).as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::BadSignature)?;

        if Utc::now().timestamp_millis() > payload.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(payload.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"0123456789abcdef0123456789abcdef".to_vec(), Duration::seconds(15))
    }

    #[test]
    fn issue_then_verify_returns_session_id() {
        let c = codec();
        let token = c.issue(42);
        assert_eq!(c.verify(&token), Ok(42));
    }

    #[test]
    fn expired_token_is_rejected() {
        let c = TokenCodec::new(b"key".to_vec(), Duration::seconds(-1));
        let token = c.issue(7);
        assert_eq!(c.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_session_id_fails_signature_check() {
        let c = codec();
        let token = c.issue(42);
        let bytes = BASE64.decode(token).unwrap();
        let mut payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        payload["session_id"] = serde_json::json!(43);
        let forged = BASE64.encode(serde_json::to_vec(&payload).unwrap());
        assert_eq!(c.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let a = codec();
        let b = TokenCodec::new(b"a completely different key".to_vec(), Duration::seconds(15));
        let token = a.issue(1);
        assert_eq!(b.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn flipped_signature_byte_fails_signature_check() {
        let c = codec();
        let token = c.issue(42);
        let bytes = BASE64.decode(token).unwrap();
        let mut payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        // Flip one hex digit of the signature, keeping it well-formed hex
        // of the correct length.
        let mut sig: Vec<u8> = payload["signature"].as_str().unwrap().bytes().collect();
        sig[0] = if sig[0] == b'0' { b'1' } else { b'0' };
        payload["signature"] = serde_json::json!(String::from_utf8(sig).unwrap());

        let forged = BASE64.encode(serde_json::to_vec(&payload).unwrap());
        assert_eq!(c.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_payloads_never_panic() {
        let c = codec();
        assert_eq!(c.verify("not base64 at all!!!"), Err(TokenError::InvalidFormat));
        assert_eq!(
            c.verify(&BASE64.encode(b"hello world")),
            Err(TokenError::InvalidFormat)
        );
        assert_eq!(
            c.verify(&BASE64.encode(br#"{"session_id":1,"expires_at":2,"signature":"zz"}"#)),
            Err(TokenError::InvalidFormat)
        );
        assert_eq!(c.verify(""), Err(TokenError::InvalidFormat));
    }
}
