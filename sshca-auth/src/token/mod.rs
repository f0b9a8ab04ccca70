//! One-time tokens authorizing a signing request.
//!
//! A token is a compact JWS signed with the provisioner's Ed25519 key:
//! 1. The caller describes the request in a [`TokenRequest`](crate::request::TokenRequest)
//! 2. [`TokenClaims::for_ssh`] binds subject, principals and validity to an audience
//! 3. [`OneTimeToken::mint`] signs the claims with a [`ProvisionerKey`]
//! 4. The authority verifies the signature against the provisioner's public key
//!
//! # Security
//!
//! - Tokens expire five minutes after issue
//! - Every token carries 128 random bits in `jti` for replay detection
//! - Verification checks the signature before any time claim

mod error;
mod key;
mod ott;

pub use error::TokenError;
pub use key::ProvisionerKey;
pub(crate) use key::decoding_key;
pub use ott::{OneTimeToken, SshClaims, StepClaims, TokenClaims, TOKEN_LIFETIME_SECS};
