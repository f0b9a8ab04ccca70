//! Request SSH user and host certificates from a certificate authority.
//!
//! The binary wires concrete collaborators into
//! [`commands::issue_certificate`]:
//! - [`ca::HttpAuthority`] - JSON signing endpoint
//! - [`provisioner::JwkProvisioner`] - One-time token minting
//! - [`secret::TerminalPrompt`] - Interactive passwords
//! - [`agent::SshAgent`] - `$SSH_AUTH_SOCK` registration

pub mod agent;
pub mod ca;
pub mod commands;
pub mod config;
pub mod error;
pub mod provisioner;
pub mod secret;
pub mod utils;
pub mod writer;

pub use error::CertificateError;
