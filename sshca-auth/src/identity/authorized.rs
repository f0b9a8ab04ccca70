//! Authorized-key text for public keys and certificates.
//!
//! Both files share the OpenSSH one-line format `<type> <base64> <comment>`.
//! The type is read from the blob itself, so the same code serializes plain
//! keys and `*-cert-v01@openssh.com` certificates.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::KeyError;

/// A raw SSH wire blob together with its declared key type.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizedKey {
    key_type: String,
    blob: Vec<u8>,
}

impl AuthorizedKey {
    /// Wrap a wire-format key or certificate blob.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::MalformedBlob` if the blob does not start with a
    /// length-prefixed UTF-8 type name.
    pub fn from_blob(blob: Vec<u8>) -> Result<Self, KeyError> {
        let key_type = read_key_type(&blob)?.to_string();
        Ok(Self { key_type, blob })
    }

    /// The key type, e.g. `ecdsa-sha2-nistp256-cert-v01@openssh.com`.
    #[must_use]
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// The raw wire blob.
    #[must_use]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Whether the blob is an OpenSSH certificate.
    #[must_use]
    pub fn is_certificate(&self) -> bool {
        self.key_type.ends_with("-cert-v01@openssh.com")
    }

    /// `<type> <base64>\n`, without a comment.
    #[must_use]
    pub fn marshal(&self) -> String {
        format!("{} {}\n", self.key_type, STANDARD.encode(&self.blob))
    }

    /// `<type> <base64> <comment>\n`.
    #[must_use]
    pub fn marshal_with_comment(&self, comment: &str) -> String {
        append_comment(&self.marshal(), comment)
    }
}

impl std::fmt::Debug for AuthorizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthorizedKey({}, {} bytes)", self.key_type, self.blob.len())
    }
}

/// Put `comment` on the same line as the key, replacing the final newline.
#[must_use]
pub fn append_comment(line: &str, comment: &str) -> String {
    let body = match line.rfind('\n') {
        Some(i) => &line[..i],
        None => line,
    };
    format!("{body} {comment}\n")
}

/// Read the leading SSH `string` of a wire blob.
fn read_key_type(blob: &[u8]) -> Result<&str, KeyError> {
    let len_bytes: [u8; 4] = blob
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(KeyError::MalformedBlob)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let name = blob.get(4..4 + len).ok_or(KeyError::MalformedBlob)?;
    let name = std::str::from_utf8(name).map_err(|_| KeyError::MalformedBlob)?;
    if name.is_empty() {
        return Err(KeyError::MalformedBlob);
    }
    Ok(name)
}
