//! Artifact persistence.
//!
//! Files are truncated and rewritten in place. Private material is `0600`,
//! public material `0644`; the mode is applied to pre-existing files too.
//! A failed write stops the flow, and earlier files are left as written.

use std::fs::{OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use sshca_auth::identity::{AuthorizedKey, KeyPair};
use sshca_auth::KeyError;

use crate::error::CertificateError;

/// Mode of private key files.
pub const PRIVATE_MODE: u32 = 0o600;
/// Mode of public key and certificate files.
pub const PUBLIC_MODE: u32 = 0o644;

/// Why an artifact could not be written.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Encode(#[from] KeyError),
}

/// A file written during issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Human label, e.g. `Certificate`.
    pub label: &'static str,
    pub path: PathBuf,
}

/// Writes artifacts and records what was written, in order.
#[derive(Debug, Default)]
pub struct ArtifactWriter {
    written: Vec<Artifact>,
}

impl ArtifactWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `pair` as an OpenSSH private key, encrypted when `password` is set.
    pub fn private_key(
        &mut self,
        label: &'static str,
        path: &Path,
        pair: &KeyPair,
        comment: &str,
        password: Option<&[u8]>,
    ) -> Result<(), CertificateError> {
        let pem = pair
            .to_openssh(comment, password)
            .map_err(|e| persistence(path, e))?;
        self.write(label, path, pem.as_bytes(), PRIVATE_MODE)
    }

    /// Write a key or certificate blob as an authorized-keys line.
    pub fn authorized_key(
        &mut self,
        label: &'static str,
        path: &Path,
        blob: &[u8],
        comment: &str,
    ) -> Result<(), CertificateError> {
        let key = AuthorizedKey::from_blob(blob.to_vec())
            .map_err(|e| persistence(path, e))?;
        self.write(
            label,
            path,
            key.marshal_with_comment(comment).as_bytes(),
            PUBLIC_MODE,
        )
    }

    fn write(
        &mut self,
        label: &'static str,
        path: &Path,
        contents: &[u8],
        mode: u32,
    ) -> Result<(), CertificateError> {
        write_file(path, contents, mode).map_err(|e| persistence(path, e))?;
        tracing::debug!("wrote {} to {}", label, path.display());
        self.written.push(Artifact {
            label,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Artifacts written so far.
    #[must_use]
    pub fn written(&self) -> &[Artifact] {
        &self.written
    }

    #[must_use]
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.written
    }
}

fn persistence(path: &Path, source: impl Into<WriteError>) -> CertificateError {
    CertificateError::Persistence {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Create or truncate `path` with `mode`, then write `contents`.
///
/// The mode is set before any byte is written so a pre-existing file with
/// looser bits never holds new private material.
pub fn write_file(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    file.set_permissions(Permissions::from_mode(mode))?;
    file.write_all(contents)?;
    file.sync_all()
}
