//! Token error types.

/// Errors that can occur while minting or checking a one-time token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The provisioner key is still encrypted.
    #[error("provisioner key is encrypted")]
    EncryptedKey,

    /// Only Ed25519 provisioner keys can sign tokens.
    #[error("unsupported provisioner key type '{0}': expected ssh-ed25519")]
    UnsupportedAlgorithm(String),

    /// The header or claims could not be serialized.
    #[error("failed to encode token")]
    Encoding,

    /// The token is not a compact JWS with the expected fields.
    #[error("malformed token")]
    Malformed,

    /// The signature does not verify against the provisioner key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// The token's `nbf` is in the future.
    #[error("token is not valid yet")]
    NotYetValid,
}
