//! Token acquisition.
//!
//! A caller-supplied token is used as-is. Otherwise the configured
//! provisioner mints a one-time token bound to the request.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sshca_auth::identity::KeyPair;
use sshca_auth::token::{OneTimeToken, ProvisionerKey, TokenClaims, TokenError};
use sshca_auth::{KeyError, TokenRequest, TokenSource};
use zeroize::Zeroizing;

use crate::secret::{obtain_password, PasswordPrompt, SecretError, PROVISIONER_PROMPT};

/// Errors while minting a token.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProvisionerError {
    #[error("missing required setting '{setting}': use '--{flag}' or the config file")]
    NotConfigured {
        setting: &'static str,
        flag: &'static str,
    },

    #[error("error reading provisioner key {}", path.display())]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error loading provisioner key")]
    Key(#[source] KeyError),

    #[error(transparent)]
    Password(#[from] SecretError),

    #[error("error creating token")]
    Token(#[from] TokenError),
}

/// Produces authorization tokens for signing requests.
pub trait TokenMinter: Send + Sync {
    /// Mint a token authorizing `request`.
    fn mint(&self, request: &TokenRequest) -> Result<String, ProvisionerError>;
}

/// Use the provided token unchanged, or mint one.
///
/// # Errors
///
/// Returns the minter's error; a provided token never fails.
pub fn acquire_token(
    source: &TokenSource,
    minter: &dyn TokenMinter,
    request: &TokenRequest,
) -> Result<String, ProvisionerError> {
    match source {
        TokenSource::Provided(token) => {
            tracing::debug!("using provided token");
            Ok(token.clone())
        }
        TokenSource::Mint { .. } => {
            tracing::debug!(subject = %request.subject, "minting token");
            minter.mint(request)
        }
    }
}

/// Mints EdDSA one-time tokens with a provisioner key on disk.
///
/// The key is loaded on every call, so an invocation with a provided
/// token never reads it.
pub struct JwkProvisioner {
    name: Option<String>,
    key_path: Option<PathBuf>,
    audience: String,
    password_file: Option<PathBuf>,
    prompt: Box<dyn PasswordPrompt>,
}

impl JwkProvisioner {
    /// Create a provisioner for the authority at `ca_url`.
    #[must_use]
    pub fn new(
        name: Option<String>,
        key_path: Option<PathBuf>,
        ca_url: &str,
        password_file: Option<PathBuf>,
        prompt: Box<dyn PasswordPrompt>,
    ) -> Self {
        Self {
            name,
            key_path,
            audience: format!("{}/1.0/ssh/sign", ca_url.trim_end_matches('/')),
            password_file,
            prompt,
        }
    }

    /// Audience the minted tokens are valid for.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    fn load_key(&self) -> Result<ProvisionerKey, ProvisionerError> {
        let path = self
            .key_path
            .as_ref()
            .ok_or(ProvisionerError::NotConfigured {
                setting: "provisioner_key",
                flag: "provisioner-key",
            })?;

        let pem = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
            ProvisionerError::ReadKey {
                path: path.clone(),
                source,
            }
        })?);
        let pair = KeyPair::from_openssh(&pem, None).map_err(ProvisionerError::Key)?;

        let pair = if pair.is_encrypted() {
            let password = obtain_password(
                self.password_file.as_deref(),
                self.prompt.as_ref(),
                PROVISIONER_PROMPT,
            )?;
            KeyPair::from_openssh(&pem, Some(password.as_bytes())).map_err(ProvisionerError::Key)?
        } else {
            pair
        };

        Ok(ProvisionerKey::from_keypair(&pair)?)
    }

    fn mint_at(&self, request: &TokenRequest, now: DateTime<Utc>) -> Result<String, ProvisionerError> {
        let name = self.name.as_deref().ok_or(ProvisionerError::NotConfigured {
            setting: "provisioner",
            flag: "provisioner",
        })?;
        let key = self.load_key()?;
        tracing::debug!(provisioner = name, kid = key.key_id(), "signing token");

        let claims = TokenClaims::for_ssh(name, &self.audience, request, now);
        Ok(OneTimeToken::mint(&key, claims)?.into_string())
    }
}

impl TokenMinter for JwkProvisioner {
    fn mint(&self, request: &TokenRequest) -> Result<String, ProvisionerError> {
        self.mint_at(request, Utc::now())
    }
}
