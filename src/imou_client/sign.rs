//! Vendor request signing
//!
//! Every Imou OpenAPI call carries an MD5 signature over the system
//! envelope: sorted `key=value` pairs joined with `&`, the app secret
//! appended directly to the end, digested and rendered as uppercase hex.

use md5::{Digest, Md5};

/// Build the canonical parameter string for signing.
///
/// Keys sort ascending by byte value; pairs render as `key=value` joined
/// with `&`, no escaping and no trailing separator. The secret is appended
/// with no separator.
fn canonical_string(params: &[(&str, String)], secret: &str) -> String {
    let mut pairs: Vec<&(&str, String)> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let joined = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}{}", joined, secret)
}

/// Sign an envelope field set with the shared secret.
///
/// Deterministic: identical params and secret always produce the identical
/// signature. `params` must not already contain a `sign` key.
pub fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical_string(params, secret).as_bytes());
    hex::encode(hasher.finalize()).to_uppercase()
}
