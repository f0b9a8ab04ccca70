//! Artifact file naming.
//!
//! SSH tools expect fixed suffixes next to a private key: `B.pub` for the
//! public key and `B-cert.pub` for the certificate. The add-user identity
//! lives beside them under `B-provisioner`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::plan::KeySource;

/// Suffix of public key files.
pub const PUBLIC_KEY_SUFFIX: &str = ".pub";
/// Suffix of certificate files.
pub const CERTIFICATE_SUFFIX: &str = "-cert.pub";
/// Infix of the add-user provisioning identity.
pub const PROVISIONER_INFIX: &str = "-provisioner";

/// Paths of every artifact one invocation may write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    key_file: PathBuf,
    base: PathBuf,
}

impl ArtifactLayout {
    /// Derive the layout from the `<key-file>` argument.
    ///
    /// When signing, `key_file` is an existing public key; a trailing `.pub`
    /// is stripped so the certificate lands next to it as `B-cert.pub`.
    #[must_use]
    pub fn new(key_file: impl Into<PathBuf>, source: KeySource) -> Self {
        let key_file = key_file.into();
        let base = match source {
            KeySource::Generate => key_file.clone(),
            KeySource::Sign => key_file
                .to_str()
                .and_then(|s| s.strip_suffix(PUBLIC_KEY_SUFFIX))
                .map(PathBuf::from)
                .unwrap_or_else(|| key_file.clone()),
        };
        Self { key_file, base }
    }

    /// The `<key-file>` argument as given (the input public key when signing).
    #[must_use]
    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Base name every other path is derived from.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    #[must_use]
    pub fn private_key(&self) -> PathBuf {
        self.base.clone()
    }

    #[must_use]
    pub fn public_key(&self) -> PathBuf {
        suffixed(&self.base, PUBLIC_KEY_SUFFIX)
    }

    #[must_use]
    pub fn certificate(&self) -> PathBuf {
        suffixed(&self.base, CERTIFICATE_SUFFIX)
    }

    #[must_use]
    pub fn provisioner_private_key(&self) -> PathBuf {
        suffixed(&self.base, PROVISIONER_INFIX)
    }

    #[must_use]
    pub fn provisioner_public_key(&self) -> PathBuf {
        suffixed(&self.provisioner_private_key(), PUBLIC_KEY_SUFFIX)
    }

    #[must_use]
    pub fn provisioner_certificate(&self) -> PathBuf {
        suffixed(&self.provisioner_private_key(), CERTIFICATE_SUFFIX)
    }
}

/// Append `suffix` to the final path component without touching extensions.
fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Comment attached to the add-user identity's public files.
#[must_use]
pub fn provisioner_comment(subject: &str) -> String {
    format!("{subject}{PROVISIONER_INFIX}")
}
