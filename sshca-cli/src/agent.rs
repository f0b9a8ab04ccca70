//! SSH agent registration.
//!
//! Only the add-identity request is spoken. Messages are framed with a
//! 4-byte big-endian length prefix.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use ssh_encoding::Encode;
use ssh_key::private::{EcdsaKeypair, KeypairData};
use ssh_key::Mpint;
use sshca_auth::identity::{AuthorizedKey, KeyPair};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use zeroize::Zeroizing;

/// Environment variable holding the agent socket path.
pub const AUTH_SOCK_ENV: &str = "SSH_AUTH_SOCK";

const SSH_AGENT_FAILURE: u8 = 5;
const SSH_AGENT_SUCCESS: u8 = 6;
const SSH_AGENTC_ADD_IDENTITY: u8 = 17;

/// Largest reply accepted from the agent.
const MAX_FRAME_SIZE: usize = 256 * 1024;

/// Errors while registering a key with the agent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AgentError {
    #[error("{AUTH_SOCK_ENV} is not set")]
    NotRunning,

    #[error("error connecting with ssh-agent at {}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error talking to ssh-agent")]
    Io(#[from] io::Error),

    #[error("ssh-agent refused the key (reply {0})")]
    Refused(u8),

    #[error("unsupported key type '{0}' for ssh-agent")]
    UnsupportedKey(String),

    #[error("certificate is not a valid SSH certificate")]
    InvalidCertificate,

    #[error("error encoding key for ssh-agent")]
    Encoding,
}

/// A running credential agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Add `key` together with its certificate.
    async fn add_certified_key(
        &self,
        key: &KeyPair,
        certificate: &[u8],
        comment: &str,
    ) -> Result<(), AgentError>;
}

/// OpenSSH-compatible agent reached over a Unix socket.
#[derive(Debug, Clone, Default)]
pub struct SshAgent {
    socket: Option<PathBuf>,
}

impl SshAgent {
    /// Agent at `$SSH_AUTH_SOCK`, if set.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            socket: std::env::var_os(AUTH_SOCK_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    #[must_use]
    pub fn with_socket(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: Some(socket.into()),
        }
    }

    async fn connect(path: &Path) -> Result<UnixStream, AgentError> {
        tracing::debug!("connecting to ssh-agent at {}", path.display());
        UnixStream::connect(path)
            .await
            .map_err(|source| AgentError::Connect {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl Agent for SshAgent {
    async fn add_certified_key(
        &self,
        key: &KeyPair,
        certificate: &[u8],
        comment: &str,
    ) -> Result<(), AgentError> {
        let path = self.socket.as_deref().ok_or(AgentError::NotRunning)?;
        let message = add_identity_message(key, certificate, comment)?;

        let mut stream = Self::connect(path).await?;
        write_frame(&mut stream, &message).await?;
        let reply = read_frame(&mut stream).await?;

        match reply.first() {
            Some(&SSH_AGENT_SUCCESS) => Ok(()),
            Some(&code) => Err(AgentError::Refused(code)),
            None => Err(AgentError::Refused(SSH_AGENT_FAILURE)),
        }
    }
}

/// Build `SSH_AGENTC_ADD_IDENTITY` for a certified key.
///
/// Layout: byte 17, string cert key type, string certificate, the
/// algorithm's private fields, string comment.
fn add_identity_message(
    key: &KeyPair,
    certificate: &[u8],
    comment: &str,
) -> Result<Zeroizing<Vec<u8>>, AgentError> {
    let cert = AuthorizedKey::from_blob(certificate.to_vec())
        .map_err(|_| AgentError::InvalidCertificate)?;
    if !cert.is_certificate() {
        return Err(AgentError::InvalidCertificate);
    }

    let mut msg = Zeroizing::new(Vec::with_capacity(certificate.len() + 256));
    encode_fields(&mut msg, key, cert.key_type(), certificate, comment)?;
    Ok(msg)
}

fn encode_fields(
    msg: &mut Vec<u8>,
    key: &KeyPair,
    cert_type: &str,
    certificate: &[u8],
    comment: &str,
) -> Result<(), AgentError> {
    let encoding = |_: ssh_encoding::Error| AgentError::Encoding;

    SSH_AGENTC_ADD_IDENTITY.encode(msg).map_err(encoding)?;
    cert_type.encode(msg).map_err(encoding)?;
    certificate.encode(msg).map_err(encoding)?;

    match key.keypair_data() {
        // Public key, then seed followed by public key
        KeypairData::Ed25519(kp) => kp.encode(msg).map_err(encoding)?,
        KeypairData::Ecdsa(ecdsa) => {
            let scalar = match ecdsa {
                EcdsaKeypair::NistP256 { private, .. } => private.as_slice(),
                EcdsaKeypair::NistP384 { private, .. } => private.as_slice(),
                EcdsaKeypair::NistP521 { private, .. } => private.as_slice(),
            };
            let scalar = Zeroizing::new(
                Mpint::from_positive_bytes(scalar).map_err(|_| AgentError::Encoding)?,
            );
            scalar.encode(msg).map_err(encoding)?;
        }
        _ => {
            return Err(AgentError::UnsupportedKey(
                key.public_key().algorithm().to_string(),
            ))
        }
    }

    comment.encode(msg).map_err(encoding)
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Bytes> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes"),
        ));
    }

    let mut buf = BytesMut::zeroed(len);
    reader.read_exact(&mut buf).await?;
    Ok(buf.freeze())
}
