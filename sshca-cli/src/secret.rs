//! Password sourcing for private key encryption and decryption.

use std::io;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

/// Prompt shown before encrypting a generated private key.
pub const ENCRYPT_PROMPT: &str = "Please enter the password to encrypt the private key";
/// Prompt shown before decrypting the provisioner key.
pub const PROVISIONER_PROMPT: &str = "Please enter the password to decrypt the provisioner key";

/// Errors while obtaining a password.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SecretError {
    #[error("error reading password file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading password from terminal")]
    Prompt(#[source] io::Error),

    #[error("password cannot be empty")]
    Empty,
}

/// Interactive source of passwords.
pub trait PasswordPrompt: Send + Sync {
    /// Ask for a password, showing `message`.
    fn read_password(&self, message: &str) -> io::Result<Zeroizing<String>>;
}

/// Reads passwords from the controlling terminal without echo.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&self, message: &str) -> io::Result<Zeroizing<String>> {
        rpassword::prompt_password(format!("{message}: ")).map(Zeroizing::new)
    }
}

/// Read a password from `path`, dropping trailing line endings.
///
/// # Errors
///
/// Returns `SecretError::Read` if the file cannot be read and
/// `SecretError::Empty` if nothing is left after trimming.
pub fn read_password_file(path: &Path) -> Result<Zeroizing<String>, SecretError> {
    let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
        SecretError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?);

    let password = Zeroizing::new(contents.trim_end_matches(['\r', '\n']).to_string());
    if password.is_empty() {
        return Err(SecretError::Empty);
    }
    Ok(password)
}

/// Read from `file` when given, otherwise ask `prompt`.
///
/// # Errors
///
/// Returns `SecretError` if reading fails or the password is empty.
pub fn obtain_password(
    file: Option<&Path>,
    prompt: &dyn PasswordPrompt,
    message: &str,
) -> Result<Zeroizing<String>, SecretError> {
    if let Some(path) = file {
        tracing::debug!("reading password from {}", path.display());
        return read_password_file(path);
    }

    let password = prompt.read_password(message).map_err(SecretError::Prompt)?;
    if password.is_empty() {
        return Err(SecretError::Empty);
    }
    Ok(password)
}
