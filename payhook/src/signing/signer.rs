//! RSASSA-PKCS1-v1_5 / SHA-256 request signing.

use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::Sha256;

use crate::errors::{Error, Result};
use crate::signing::canonical::{CanonicalRequest, build_canonical_string};
use crate::signing::keys::KeyMaterial;

/// Sign the canonical form of `req` and return the signature as lowercase hex.
///
/// The date in `req` is used as given; signing the same request twice with the same key
/// yields the same signature.
pub fn sign(req: &CanonicalRequest<'_>, private_key: &KeyMaterial) -> Result<String> {
    let key = private_key.as_private().map_err(|e| Error::Signing(e.to_string()))?;
    let signing_key = SigningKey::<Sha256>::new(key.clone());

    let canonical = build_canonical_string(req);
    let signature = signing_key
        .try_sign(&canonical)
        .map_err(|e| Error::Signing(e.to_string()))?;

    Ok(hex::encode(signature.to_bytes()))
}
