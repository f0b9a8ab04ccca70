//! Issuance errors.

use std::io;
use std::path::PathBuf;

use sshca_auth::{KeyError, ValidationError};

use crate::ca::AuthorityError;
use crate::provisioner::ProvisionerError;
use crate::secret::SecretError;
use crate::writer::WriteError;

/// Why an existing public key could not be used.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeyFileError {
    #[error(transparent)]
    Read(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] KeyError),
}

/// Fatal outcome of one issuance.
///
/// Everything before `Persistence` fails with no file touched. Agent
/// registration never produces an error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CertificateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("error acquiring token")]
    Credential(#[from] ProvisionerError),

    #[error("error loading public key {}", path.display())]
    KeyMaterial {
        path: PathBuf,
        #[source]
        source: KeyFileError,
    },

    #[error("error generating key pair")]
    KeyGeneration(#[source] KeyError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Password(#[from] SecretError),

    #[error("error writing {}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: WriteError,
    },
}
