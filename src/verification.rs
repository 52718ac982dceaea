use crate::error::HookError;
use crate::types::WebhookDelivery;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Verify a GitHub `X-Hub-Signature-256` value ("sha256=<hex>").
pub fn verify_github_hmac(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let expected = match decode_signature(signature_header, "sha256=") {
        Some(bytes) => bytes,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Verify a legacy `X-Hub-Signature` value ("sha1=<hex>").
pub fn verify_github_hmac_sha1(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let expected = match decode_signature(signature_header, "sha1=") {
        Some(bytes) => bytes,
        None => return false,
    };

    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Check a delivery against the shared secret before anything reads its body.
///
/// The sha256 header wins when present; the sha1 header is only consulted
/// for senders that do not emit the newer one.
pub fn verify_delivery(secret: &str, delivery: &WebhookDelivery) -> Result<(), HookError> {
    let valid = match (&delivery.signature_256, &delivery.signature_sha1) {
        (Some(sig), _) => verify_github_hmac(secret, &delivery.body, sig),
        (None, Some(sig)) => verify_github_hmac_sha1(secret, &delivery.body, sig),
        (None, None) => false,
    };

    if valid {
        Ok(())
    } else {
        Err(HookError::SignatureInvalid)
    }
}

fn decode_signature(header: &str, prefix: &str) -> Option<Vec<u8>> {
    let hex_part = header.trim().strip_prefix(prefix)?;
    hex::decode(hex_part).ok()
}

/// Compute the `X-Hub-Signature-256` header value for a body.
#[cfg(test)]
pub fn sign_sha256(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
