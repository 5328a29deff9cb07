//! Signature verification against an RSA public key.

use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha2::Sha256;

use crate::errors::{Error, Result};
use crate::signing::canonical::{CanonicalRequest, build_canonical_string};
use crate::signing::keys::KeyMaterial;

/// Check a hex `signature` over the canonical form of `req`.
///
/// Returns [`Error::InvalidSignature`] when the signature does not match, and
/// [`Error::MalformedSignature`] or [`Error::KeyRole`] when the inputs cannot be checked at all.
/// Freshness of `req.date` is not checked here, see [`crate::webhooks::policy`].
pub fn verify(req: &CanonicalRequest<'_>, public_key: &KeyMaterial, signature: &str) -> Result<()> {
    let key = public_key.as_public()?;

    let bytes = hex::decode(signature.trim()).map_err(|e| Error::MalformedSignature { reason: e.to_string() })?;
    if bytes.is_empty() {
        return Err(Error::MalformedSignature {
            reason: "empty signature".to_string(),
        });
    }
    let signature = Signature::try_from(bytes.as_slice()).map_err(|e| Error::MalformedSignature { reason: e.to_string() })?;

    let canonical = build_canonical_string(req);
    VerifyingKey::<Sha256>::new(key.clone())
        .verify(&canonical, &signature)
        .map_err(|_| Error::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::keys::fixtures::*;
    use crate::signing::keys::{KeyRole, parse_private_key, parse_public_key};
    use crate::signing::signer::sign;

    const DATE: &str = "Mon, 01 Jan 2024 00:00:00 GMT";
    const BODY: &str = r#"{"paymentId":"p1","paymentData":{"paymentId":"p1","amount":12.5}}"#;

    fn request() -> CanonicalRequest<'static> {
        CanonicalRequest::new("POST", "example.com", "/hooks/incoming", DATE, Some(BODY))
    }

    fn signed() -> String {
        sign(&request(), &parse_private_key(PRIVATE_PEM).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let public = parse_public_key(PUBLIC_PEM).unwrap();
        verify(&request(), &public, &signed()).expect("signature should verify");
    }

    #[test]
    fn test_round_trip_empty_body() {
        let req = CanonicalRequest::new("POST", "example.com", "/", DATE, None::<&str>);
        let signature = sign(&req, &parse_private_key(PRIVATE_PEM).unwrap()).unwrap();
        verify(&req, &parse_public_key(PUBLIC_PEM).unwrap(), &signature).unwrap();
    }

    #[test]
    fn test_public_half_of_private_key_verifies() {
        let private = parse_private_key(PRIVATE_PEM).unwrap();
        verify(&request(), &private.to_public(), &signed()).unwrap();
    }

    #[test]
    fn test_tampered_fields_rejected() {
        let public = parse_public_key(PUBLIC_PEM).unwrap();
        let signature = signed();

        let tampered = [
            CanonicalRequest::new("PUT", "example.com", "/hooks/incoming", DATE, Some(BODY)),
            CanonicalRequest::new("POST", "example.org", "/hooks/incoming", DATE, Some(BODY)),
            CanonicalRequest::new("POST", "example.com", "/hooks/incominG", DATE, Some(BODY)),
            CanonicalRequest::new("POST", "example.com", "/hooks/incoming", "Mon, 01 Jan 2024 00:00:01 GMT", Some(BODY)),
            CanonicalRequest::new("POST", "example.com", "/hooks/incoming", DATE, Some(BODY.replace("12.5", "92.5"))),
            CanonicalRequest::new("POST", "example.com", "/hooks/incoming", DATE, None::<&str>),
        ];

        for req in &tampered {
            let err = verify(req, &public, &signature).unwrap_err();
            assert!(err.is_invalid_signature(), "expected InvalidSignature for {req:?}, got {err:?}");
        }
    }

    #[test]
    fn test_every_body_byte_is_covered() {
        let public = parse_public_key(PUBLIC_PEM).unwrap();
        let signature = signed();

        for i in 0..BODY.len() {
            let mut body = BODY.as_bytes().to_vec();
            body[i] ^= 0x01;
            let body = String::from_utf8(body).unwrap();
            let req = CanonicalRequest::new("POST", "example.com", "/hooks/incoming", DATE, Some(body));
            assert!(matches!(verify(&req, &public, &signature), Err(Error::InvalidSignature)));
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let public = parse_public_key(PUBLIC_PEM).unwrap();
        let mut signature = signed().into_bytes();
        signature[10] = if signature[10] == b'0' { b'1' } else { b'0' };
        let signature = String::from_utf8(signature).unwrap();

        assert!(matches!(verify(&request(), &public, &signature), Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_cross_key_rejected() {
        let other = parse_public_key(OTHER_PUBLIC_PEM).unwrap();
        assert!(matches!(verify(&request(), &other, &signed()), Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_non_hex_signature_is_malformed() {
        let public = parse_public_key(PUBLIC_PEM).unwrap();
        let err = verify(&request(), &public, "zz-not-hex").unwrap_err();
        assert!(matches!(err, Error::MalformedSignature { .. }));
        assert!(!err.is_invalid_signature());
    }

    #[test]
    fn test_empty_signature_is_malformed() {
        let public = parse_public_key(PUBLIC_PEM).unwrap();
        assert!(matches!(verify(&request(), &public, ""), Err(Error::MalformedSignature { .. })));
    }

    #[test]
    fn test_private_key_cannot_verify() {
        let private = parse_private_key(PRIVATE_PEM).unwrap();
        assert!(matches!(
            verify(&request(), &private, &signed()),
            Err(Error::KeyRole {
                expected: KeyRole::Public,
                found: KeyRole::Private
            })
        ));
    }
}
