//! Signing request and response types.
//!
//! These types describe one signing exchange with the authority. They carry
//! raw SSH wire blobs; transport encoding belongs to the client adapter.

use serde::{Deserialize, Serialize};
use ssh_key::{Certificate, PublicKey};

use crate::validity::ValidityWindow;

/// Kind of certificate being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertType {
    User,
    Host,
}

impl CertType {
    /// Wire name used by the authority (`user` / `host`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CertType::User => "user",
            CertType::Host => "host",
        }
    }
}

impl std::fmt::Display for CertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs handed to a token minter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub subject: String,
    pub cert_type: CertType,
    pub principals: Vec<String>,
    pub validity: ValidityWindow,
}

/// A certificate request, minus the authorization token.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Identity label; also used as the key ID and file comment.
    pub subject: String,
    pub cert_type: CertType,
    /// Non-empty, order preserved.
    pub principals: Vec<String>,
    pub validity: ValidityWindow,
    /// Public key to certify, SSH wire format.
    pub public_key: Vec<u8>,
    /// Public key of the add-user provisioning identity, SSH wire format.
    pub auxiliary_public_key: Option<Vec<u8>>,
}

impl std::fmt::Debug for CertificateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRequest")
            .field("subject", &self.subject)
            .field("cert_type", &self.cert_type)
            .field("principals", &self.principals)
            .field("validity", &self.validity)
            .field("public_key_len", &self.public_key.len())
            .field("auxiliary", &self.auxiliary_public_key.is_some())
            .finish()
    }
}

/// A request together with the one-time token authorizing it.
#[derive(Clone)]
pub struct SignRequest {
    pub token: String,
    pub request: CertificateRequest,
}

impl std::fmt::Debug for SignRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token is a bearer credential
        f.debug_struct("SignRequest")
            .field("token", &"<redacted>")
            .field("request", &self.request)
            .finish()
    }
}

/// Errors raised when a response does not match its request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ResponseError {
    /// A returned blob is not an SSH certificate.
    #[error("authority returned a malformed {which} certificate")]
    MalformedCertificate { which: &'static str },

    /// A certificate certifies a different key than the one submitted.
    #[error("authority returned a {which} certificate for a different public key")]
    KeyMismatch { which: &'static str },

    /// Add-user was requested but no provisioner certificate came back.
    #[error("authority did not return the add-user certificate")]
    MissingAuxiliaryCertificate,

    /// A provisioner certificate came back although none was requested.
    #[error("authority returned an add-user certificate that was not requested")]
    UnexpectedAuxiliaryCertificate,
}

/// Certificates returned by the authority, SSH wire format.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateResponse {
    pub certificate: Vec<u8>,
    pub auxiliary_certificate: Option<Vec<u8>>,
}

impl std::fmt::Debug for CertificateResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateResponse")
            .field("certificate_len", &self.certificate.len())
            .field("auxiliary", &self.auxiliary_certificate.is_some())
            .finish()
    }
}

impl CertificateResponse {
    /// Check that the response answers `request`.
    ///
    /// The auxiliary certificate must be present exactly when an auxiliary
    /// key was submitted, and each certificate must certify the key it was
    /// requested for.
    ///
    /// # Errors
    ///
    /// Returns the first `ResponseError` found.
    pub fn check_against(&self, request: &CertificateRequest) -> Result<(), ResponseError> {
        ensure_binds(&self.certificate, &request.public_key, "user or host")?;

        match (&request.auxiliary_public_key, &self.auxiliary_certificate) {
            (Some(key), Some(cert)) => ensure_binds(cert, key, "add-user"),
            (Some(_), None) => Err(ResponseError::MissingAuxiliaryCertificate),
            (None, Some(_)) => Err(ResponseError::UnexpectedAuxiliaryCertificate),
            (None, None) => Ok(()),
        }
    }
}

fn ensure_binds(cert: &[u8], public_key: &[u8], which: &'static str) -> Result<(), ResponseError> {
    let cert =
        Certificate::from_bytes(cert).map_err(|_| ResponseError::MalformedCertificate { which })?;
    let submitted =
        PublicKey::from_bytes(public_key).map_err(|_| ResponseError::KeyMismatch { which })?;

    if cert.public_key() == submitted.key_data() {
        Ok(())
    } else {
        Err(ResponseError::KeyMismatch { which })
    }
}
