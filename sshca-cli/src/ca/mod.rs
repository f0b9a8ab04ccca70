//! Certificate authority client.

mod client;

use std::path::PathBuf;

use async_trait::async_trait;
use sshca_auth::{CertificateResponse, ResponseError, SignRequest};

pub use client::HttpAuthority;

/// Errors from the signing exchange.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthorityError {
    #[error("error reading root certificate {}", path.display())]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid root certificate {}", path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("error contacting the certificate authority")]
    Transport(#[source] reqwest::Error),

    #[error("certificate authority rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from certificate authority: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Mismatch(#[from] ResponseError),
}

/// One signing exchange with an SSH certificate authority.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Submit `request` and return the signed certificate(s).
    ///
    /// Exactly one exchange is made; there are no retries.
    async fn sign_ssh(&self, request: &SignRequest) -> Result<CertificateResponse, AuthorityError>;
}
