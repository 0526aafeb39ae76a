//! Webhook payload signing and secret generation.
//!
//! Outbound webhook bodies are signed with HMAC-SHA256 over the raw JSON
//! text and the hex digest is sent as `X-Webhook-Signature: sha256=<hex>`.
//! Inbound verification goes through [`verify_signature`], which compares in
//! constant time via [`Mac::verify_slice`].

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header value prefix for webhook signatures.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Length of generated webhook secrets (alphanumeric characters).
pub const SECRET_LENGTH: usize = 48;

/// Compute the hex-encoded HMAC-SHA256 signature for a payload.
pub fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build the full `X-Webhook-Signature` header value for a payload.
pub fn signature_header(secret: &str, payload: &str) -> String {
    format!("{SIGNATURE_PREFIX}{}", sign_payload(secret, payload))
}

/// Verify a hex-encoded signature against a payload in constant time.
///
/// Accepts the digest with or without the `sha256=` prefix. Malformed hex
/// and wrong-length digests verify as false without shortcutting on content.
pub fn verify_signature(secret: &str, payload: &str, signature: &str) -> bool {
    let digest_hex = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
    let Ok(digest) = hex::decode(digest_hex) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&digest).is_ok()
}

/// Generate a new random webhook signing secret.
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
