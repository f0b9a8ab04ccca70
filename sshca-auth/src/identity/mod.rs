//! Key material for SSH certificate issuance.
//!
//! - [`KeyPair`] - Generated or loaded key pair, zeroized on drop
//! - [`AuthorizedKey`] - Wire blob of a key or certificate, rendered as an
//!   authorized-keys line with a trailing comment
//! - [`parse_authorized_key`] - Parse an existing `*.pub` file for signing
//!
//! # Example
//!
//! ```
//! use sshca_auth::identity::{AuthorizedKey, KeyPair};
//!
//! let pair = KeyPair::generate().unwrap();
//! let public = AuthorizedKey::from_blob(pair.public_key_bytes().unwrap()).unwrap();
//! let line = public.marshal_with_comment("mariano@work");
//! assert!(line.ends_with(" mariano@work\n"));
//! ```

mod authorized;
mod keys;

pub use authorized::{append_comment, AuthorizedKey};
pub use keys::{parse_authorized_key, KeyError, KeyPair, DEFAULT_ALGORITHM};
