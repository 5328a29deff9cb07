//! Canonical request string: the exact bytes that are signed and verified.
//!
//! ```text
//! {method}\n{host}\n{path}\n{date}\n{body}
//! ```
//!
//! No trailing newline. An absent body is the empty string. Both sides must build this
//! identically or verification fails with [`crate::errors::Error::InvalidSignature`].

use std::borrow::Cow;

/// Request fields covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    pub method: Cow<'a, str>,
    pub host: Cow<'a, str>,
    pub path: Cow<'a, str>,
    pub date: Cow<'a, str>,
    pub body: Option<Cow<'a, str>>,
}

impl<'a> CanonicalRequest<'a> {
    pub fn new(
        method: impl Into<Cow<'a, str>>,
        host: impl Into<Cow<'a, str>>,
        path: impl Into<Cow<'a, str>>,
        date: impl Into<Cow<'a, str>>,
        body: Option<impl Into<Cow<'a, str>>>,
    ) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            date: date.into(),
            body: body.map(Into::into),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        build_canonical_string(self)
    }
}

/// Build the UTF-8 canonical string for `req`.
pub fn build_canonical_string(req: &CanonicalRequest<'_>) -> Vec<u8> {
    let body = req.body.as_deref().unwrap_or("");
    format!("{}\n{}\n{}\n{}\n{}", req.method, req.host, req.path, req.date, body).into_bytes()
}
