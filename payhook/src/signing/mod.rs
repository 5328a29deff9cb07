//! Request signing protocol.
//!
//! - [`keys`]: PEM parsing into role-tagged RSA key handles
//! - [`canonical`]: the newline-joined string covered by the signature
//! - [`signer`]: RSASSA-PKCS1-v1_5 over SHA-256, hex-encoded
//! - [`verifier`]: the matching check, with mismatches reported as [`crate::errors::Error::InvalidSignature`]

pub mod canonical;
pub mod keys;
pub mod signer;
pub mod verifier;

pub use canonical::{CanonicalRequest, build_canonical_string};
pub use keys::{KeyMaterial, KeyRole, parse_private_key, parse_public_key};
pub use signer::sign;
pub use verifier::verify;
