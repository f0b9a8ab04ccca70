//! Pure issuance library for SSH certificates.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No terminal prompts
//! - No logging
//!
//! It decides *what* one issuance does; the CLI crate performs it:
//! - [`validate`] - Ordered flag-conflict table
//! - [`plan::IssuePlan`] - Validated, typed form of the flags
//! - [`principal`] - Default principals from the subject
//! - [`layout::ArtifactLayout`] - Output file names
//! - [`identity`] - Key pairs and authorized-keys encoding
//! - [`token`] - Provisioner one-time tokens
//! - [`request`] - Signing request and response checks
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use sshca_auth::{resolve_principals, CertificateFlags, IssuePlan};
//!
//! let flags = CertificateFlags {
//!     host: true,
//!     ..Default::default()
//! };
//! let plan = IssuePlan::from_flags(flags, Utc::now()).unwrap();
//! let principals = resolve_principals("internal.example.com", plan.cert_type(), &plan.principals);
//! assert_eq!(principals, vec!["internal.example.com"]);
//! ```

pub mod identity;
pub mod layout;
pub mod plan;
pub mod principal;
pub mod request;
pub mod token;
pub mod validate;
pub mod validity;

pub use identity::{AuthorizedKey, KeyError, KeyPair};
pub use layout::ArtifactLayout;
pub use plan::{CertProfile, IssuePlan, KeySource, PrivateKeyProtection, TokenSource};
pub use principal::{resolve_principals, sanitize_user_principal};
pub use request::{
    CertType, CertificateRequest, CertificateResponse, ResponseError, SignRequest, TokenRequest,
};
pub use token::{OneTimeToken, ProvisionerKey, TokenClaims, TokenError};
pub use validate::{validate, CertificateFlags, ValidationError};
pub use validity::{TimeParseError, ValidityWindow};
