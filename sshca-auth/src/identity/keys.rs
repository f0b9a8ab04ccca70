//! SSH key material for certificate issuance.
//!
//! This module wraps `ssh-key` types with the handling the issuance flow needs:
//! - Private keys are zeroized on drop (the inner `ssh_key::PrivateKey` does it)
//! - No Debug/Display implementations that leak secrets
//! - The comment is attached only when the key is serialized
//! - OpenSSH exports are returned as `Zeroizing<String>`

use rand::rngs::OsRng;
use ssh_key::private::KeypairData;
use ssh_key::{Algorithm, EcdsaCurve, HashAlg, LineEnding, PrivateKey, PublicKey};
use zeroize::Zeroizing;

/// Algorithm used when a new key pair is generated.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::Ecdsa {
    curve: EcdsaCurve::NistP256,
};

/// Errors that can occur during key operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeyError {
    /// Key generation failed in the underlying provider.
    #[error("failed to generate key pair")]
    Generate(#[source] ssh_key::Error),

    /// The input does not contain any key line.
    #[error("no public key found")]
    MissingPublicKey,

    /// The public key could not be parsed.
    #[error("error parsing public key")]
    InvalidPublicKey(#[source] ssh_key::Error),

    /// The private key could not be parsed.
    #[error("error parsing private key")]
    InvalidPrivateKey(#[source] ssh_key::Error),

    /// A raw key or certificate blob is truncated or malformed.
    #[error("malformed key blob")]
    MalformedBlob,

    /// Serializing the key failed.
    #[error("error encoding key")]
    Encoding(#[source] ssh_key::Error),

    /// Encrypting the private key failed.
    #[error("error encrypting private key")]
    Encryption(#[source] ssh_key::Error),

    /// Decrypting the private key failed (usually a wrong password).
    #[error("error decrypting private key")]
    Decryption(#[source] ssh_key::Error),
}

/// A freshly generated or loaded SSH key pair.
///
/// # Security
///
/// - Zeroized on drop through `ssh_key::PrivateKey`
/// - No `Debug` implementation to prevent accidental logging
/// - Exports go through [`KeyPair::to_openssh`], which returns zeroizing storage
pub struct KeyPair(PrivateKey);

// Explicitly NO Debug implementation for KeyPair

impl KeyPair {
    /// Generate a new key pair with [`DEFAULT_ALGORITHM`].
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Generate` if the provider fails.
    pub fn generate() -> Result<Self, KeyError> {
        let key = PrivateKey::random(&mut OsRng, DEFAULT_ALGORITHM).map_err(KeyError::Generate)?;
        Ok(Self(key))
    }

    /// Wrap an already decrypted private key.
    #[must_use]
    pub fn from_private_key(key: PrivateKey) -> Self {
        Self(key)
    }

    /// Parse an OpenSSH private key, decrypting it when a password is given.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidPrivateKey` for malformed input and
    /// `KeyError::Decryption` if the password does not open the key.
    pub fn from_openssh(pem: &str, password: Option<&[u8]>) -> Result<Self, KeyError> {
        let key = PrivateKey::from_openssh(pem).map_err(KeyError::InvalidPrivateKey)?;
        match password {
            Some(password) if key.is_encrypted() => key
                .decrypt(password)
                .map(Self)
                .map_err(KeyError::Decryption),
            _ => Ok(Self(key)),
        }
    }

    /// Whether the wrapped key still needs a password.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.0.is_encrypted()
    }

    /// The public half of the key pair.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        self.0.public_key()
    }

    /// The public key in SSH wire format.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Encoding` if the key cannot be serialized.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, KeyError> {
        self.0.public_key().to_bytes().map_err(KeyError::Encoding)
    }

    /// Raw key pair data, for protocols that need the private scalar.
    ///
    /// # Security
    ///
    /// The returned reference must not be copied into long-lived storage.
    #[must_use]
    pub fn keypair_data(&self) -> &KeypairData {
        self.0.key_data()
    }

    /// The wrapped `ssh-key` private key.
    #[must_use]
    pub fn private_key(&self) -> &PrivateKey {
        &self.0
    }

    /// SHA-256 fingerprint of the public key (`SHA256:...`).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.0.public_key().fingerprint(HashAlg::Sha256).to_string()
    }

    /// Serialize the private key in OpenSSH format with the given comment.
    ///
    /// When `password` is set the key is encrypted with bcrypt-pbkdf + AES.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Encryption` or `KeyError::Encoding` on failure.
    pub fn to_openssh(
        &self,
        comment: &str,
        password: Option<&[u8]>,
    ) -> Result<Zeroizing<String>, KeyError> {
        let labelled = PrivateKey::new(self.0.key_data().clone(), comment)
            .map_err(KeyError::Encoding)?;
        let key = match password {
            Some(password) => labelled
                .encrypt(&mut OsRng, password)
                .map_err(KeyError::Encryption)?,
            None => labelled,
        };
        key.to_openssh(LineEnding::LF).map_err(KeyError::Encoding)
    }
}

/// Parse the first entry of an authorized-keys style text.
///
/// Blank lines and `#` comments are skipped. The entry must be
/// `<type> <base64> [comment]`.
///
/// # Errors
///
/// Returns `KeyError::MissingPublicKey` if no entry is present and
/// `KeyError::InvalidPublicKey` if the entry does not parse.
pub fn parse_authorized_key(text: &str) -> Result<PublicKey, KeyError> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or(KeyError::MissingPublicKey)?;

    PublicKey::from_openssh(line).map_err(KeyError::InvalidPublicKey)
}
