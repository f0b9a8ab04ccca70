//! Provisioner signing key.

use base64::prelude::*;
use ed25519_dalek::pkcs8::{EncodePrivateKey, KeypairBytes};
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};
use ssh_key::private::KeypairData;
use zeroize::Zeroizing;

use crate::identity::KeyPair;

use super::TokenError;

/// Ed25519 key a provisioner signs one-time tokens with.
///
/// The key ID is the RFC 7638 JWK thumbprint of the public key, which is
/// how the authority looks the provisioner key up.
///
/// # Security
///
/// - `SigningKey` zeroizes itself on drop
/// - No `Debug` implementation
pub struct ProvisionerKey {
    signing_key: SigningKey,
    key_id: String,
}

impl ProvisionerKey {
    /// Build from a decrypted SSH key pair.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::EncryptedKey` if the key still needs a password,
    /// and `TokenError::UnsupportedAlgorithm` for anything but Ed25519.
    pub fn from_keypair(pair: &KeyPair) -> Result<Self, TokenError> {
        if pair.is_encrypted() {
            return Err(TokenError::EncryptedKey);
        }
        match pair.keypair_data() {
            KeypairData::Ed25519(kp) => {
                let seed = Zeroizing::new(kp.private.to_bytes());
                Ok(Self::from_seed(&seed))
            }
            _ => Err(TokenError::UnsupportedAlgorithm(
                pair.public_key().algorithm().to_string(),
            )),
        }
    }

    /// Build from a raw 32-byte Ed25519 seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let key_id = thumbprint(&signing_key.verifying_key());
        Self {
            signing_key,
            key_id,
        }
    }

    /// JWK thumbprint, sent as the token's `kid`.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// PKCS#8 form of the signing key for the JWS encoder.
    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, TokenError> {
        let bytes = KeypairBytes {
            secret_key: self.signing_key.to_bytes(),
            public_key: None,
        };
        let der = bytes.to_pkcs8_der().map_err(|_| TokenError::Encoding)?;
        Ok(EncodingKey::from_ed_der(der.as_bytes()))
    }
}

/// JWS verification key for an Ed25519 public key.
pub(crate) fn decoding_key(key: &VerifyingKey) -> Result<DecodingKey, TokenError> {
    DecodingKey::from_ed_components(&BASE64_URL_SAFE_NO_PAD.encode(key.as_bytes()))
        .map_err(|_| TokenError::Malformed)
}

/// RFC 7638 thumbprint of an Ed25519 JWK.
///
/// Members are in lexicographic order with no whitespace.
fn thumbprint(key: &VerifyingKey) -> String {
    let jwk = format!(
        r#"{{"crv":"Ed25519","kty":"OKP","x":"{}"}}"#,
        BASE64_URL_SAFE_NO_PAD.encode(key.as_bytes())
    );
    BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(jwk.as_bytes()))
}
