//! JSON-over-HTTPS authority client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sshca_auth::validity::format_bound;
use sshca_auth::{CertType, CertificateResponse, SignRequest};

use super::{AuthorityError, CertificateAuthority};

/// Request timeout applied by the transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignSshBody<'a> {
    public_key: String,
    ott: &'a str,
    principals: &'a [String],
    cert_type: CertType,
    valid_after: String,
    valid_before: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    add_user_public_key: Option<String>,
}

impl<'a> SignSshBody<'a> {
    fn new(request: &'a SignRequest) -> Self {
        let req = &request.request;
        Self {
            public_key: BASE64_STANDARD.encode(&req.public_key),
            ott: &request.token,
            principals: &req.principals,
            cert_type: req.cert_type,
            valid_after: format_bound(req.validity.valid_after),
            valid_before: format_bound(req.validity.valid_before),
            add_user_public_key: req
                .auxiliary_public_key
                .as_ref()
                .map(|key| BASE64_STANDARD.encode(key)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignSshReply {
    crt: String,
    #[serde(default)]
    add_user_crt: Option<String>,
}

impl SignSshReply {
    fn into_response(self) -> Result<CertificateResponse, AuthorityError> {
        let decode = |field: &str, value: &str| {
            BASE64_STANDARD
                .decode(value)
                .map_err(|e| AuthorityError::InvalidResponse(format!("{field}: {e}")))
        };
        Ok(CertificateResponse {
            certificate: decode("crt", &self.crt)?,
            auxiliary_certificate: self
                .add_user_crt
                .as_deref()
                .filter(|crt| !crt.is_empty())
                .map(|crt| decode("addUserCrt", crt))
                .transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    message: Option<String>,
}

/// Authority reached at `<ca_url>/ssh/sign`.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: Client,
    sign_url: String,
}

impl HttpAuthority {
    /// Create a client for `ca_url`, trusting `root` in addition to the
    /// platform roots when given.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError` if the root cannot be loaded or the HTTP
    /// client cannot be built.
    pub fn new(ca_url: &str, root: Option<&Path>) -> Result<Self, AuthorityError> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);

        if let Some(path) = root {
            let pem = std::fs::read(path).map_err(|source| AuthorityError::ReadRoot {
                path: path.to_path_buf(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|source| {
                AuthorityError::InvalidRoot {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(AuthorityError::Transport)?;
        Ok(Self {
            client,
            sign_url: format!("{}/ssh/sign", ca_url.trim_end_matches('/')),
        })
    }

    /// Endpoint requests are posted to.
    #[must_use]
    pub fn sign_url(&self) -> &str {
        &self.sign_url
    }
}

#[async_trait]
impl CertificateAuthority for HttpAuthority {
    async fn sign_ssh(&self, request: &SignRequest) -> Result<CertificateResponse, AuthorityError> {
        tracing::debug!(url = %self.sign_url, ?request, "requesting certificate");

        let response = self
            .client
            .post(&self.sign_url)
            .json(&SignSshBody::new(request))
            .send()
            .await
            .map_err(AuthorityError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthorityError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body, status.canonical_reason()),
            });
        }

        let reply: SignSshReply = response
            .json()
            .await
            .map_err(|e| AuthorityError::InvalidResponse(e.to_string()))?;
        reply.into_response()
    }
}

/// The server's `message` field, falling back to the raw body or reason.
fn rejection_message(body: &str, reason: Option<&str>) -> String {
    let parsed: ErrorReply = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .filter(|m| !m.is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| reason.unwrap_or("request failed").to_string())
}
