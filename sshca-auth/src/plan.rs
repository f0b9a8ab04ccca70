//! Validated issuance plan.
//!
//! [`IssuePlan::from_flags`] is the only way to build a plan, and it runs the
//! conflict table first. Key source and certificate profile are separate
//! tagged variants, so an add-user host certificate cannot be expressed.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::request::CertType;
use crate::validate::{validate, CertificateFlags, ValidationError};
use crate::validity::{parse_time_or_duration, ValidityWindow};

/// Where the certified public key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Generate a new key pair and write private and public key files.
    Generate,
    /// Certify an existing public key file; no private key is handled.
    Sign,
}

/// Kind of certificate and whether an add-user identity accompanies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertProfile {
    User { add_user: bool },
    Host,
}

impl CertProfile {
    #[must_use]
    pub fn cert_type(&self) -> CertType {
        match self {
            CertProfile::User { .. } => CertType::User,
            CertProfile::Host => CertType::Host,
        }
    }

    #[must_use]
    pub fn add_user(&self) -> bool {
        matches!(self, CertProfile::User { add_user: true })
    }
}

/// How the generated private key is protected on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKeyProtection {
    /// Written unencrypted (`--no-password --insecure`).
    Plaintext,
    /// Encrypted with the password read from this file.
    PasswordFile(PathBuf),
    /// Encrypted with a password typed at an interactive prompt.
    Prompt,
}

/// Where the authorization token comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Supplied by the caller, used unmodified.
    Provided(String),
    /// Minted by the provisioner, optionally unlocking its key from a file.
    Mint {
        provisioner_password_file: Option<PathBuf>,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Provided(_) => f.write_str("Provided(<redacted>)"),
            TokenSource::Mint {
                provisioner_password_file,
            } => f
                .debug_struct("Mint")
                .field("provisioner_password_file", provisioner_password_file)
                .finish(),
        }
    }
}

/// Everything the flow needs to decide, fixed before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePlan {
    pub key_source: KeySource,
    pub profile: CertProfile,
    pub protection: PrivateKeyProtection,
    pub token: TokenSource,
    /// Explicit principals; may be empty.
    pub principals: Vec<String>,
    pub validity: ValidityWindow,
}

impl IssuePlan {
    /// Validate `flags` and turn them into a plan.
    ///
    /// Relative validity bounds are resolved against `now`.
    ///
    /// # Errors
    ///
    /// Returns the first conflict of the validation table, then any
    /// malformed or empty validity window.
    pub fn from_flags(flags: CertificateFlags, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        validate(&flags)?;

        let validity = ValidityWindow {
            valid_after: parse_bound("not-before", flags.not_before.as_deref(), now)?,
            valid_before: parse_bound("not-after", flags.not_after.as_deref(), now)?,
        };
        if validity.is_empty_range() {
            return Err(ValidationError::EmptyValidityWindow);
        }

        let key_source = if flags.sign {
            KeySource::Sign
        } else {
            KeySource::Generate
        };

        let profile = if flags.host {
            CertProfile::Host
        } else {
            CertProfile::User {
                add_user: flags.add_user,
            }
        };

        // `--no-password` has already been checked against `--insecure`
        let protection = match (flags.no_password, flags.password_file) {
            (true, _) => PrivateKeyProtection::Plaintext,
            (false, Some(path)) => PrivateKeyProtection::PasswordFile(path),
            (false, None) => PrivateKeyProtection::Prompt,
        };

        let token = match flags.token.filter(|t| !t.is_empty()) {
            Some(token) => TokenSource::Provided(token),
            None => TokenSource::Mint {
                provisioner_password_file: flags.provisioner_password_file,
            },
        };

        Ok(Self {
            key_source,
            profile,
            protection,
            token,
            principals: flags.principals,
            validity,
        })
    }

    #[must_use]
    pub fn cert_type(&self) -> CertType {
        self.profile.cert_type()
    }

    /// Whether this invocation creates (and must persist) a private key.
    #[must_use]
    pub fn generates_key(&self) -> bool {
        self.key_source == KeySource::Generate
    }
}

fn parse_bound(
    flag: &'static str,
    value: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    parse_time_or_duration(value, now).map_err(|_| ValidationError::InvalidTime {
        flag,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_plan() {
        let plan = IssuePlan::from_flags(CertificateFlags::default(), now()).unwrap();
        assert_eq!(plan.key_source, KeySource::Generate);
        assert_eq!(plan.profile, CertProfile::User { add_user: false });
        assert_eq!(plan.protection, PrivateKeyProtection::Prompt);
        assert_eq!(
            plan.token,
            TokenSource::Mint {
                provisioner_password_file: None
            }
        );
        assert_eq!(plan.validity, ValidityWindow::default());
        assert!(plan.generates_key());
    }

    #[test]
    fn test_sign_host_plan() {
        let flags = CertificateFlags {
            sign: true,
            host: true,
            token: Some("ott".into()),
            password_file: Some("pw".into()),
            ..Default::default()
        };
        let plan = IssuePlan::from_flags(flags, now()).unwrap();
        assert_eq!(plan.key_source, KeySource::Sign);
        assert_eq!(plan.cert_type(), CertType::Host);
        assert!(!plan.profile.add_user());
        assert_eq!(plan.token, TokenSource::Provided("ott".into()));
        assert_eq!(
            plan.protection,
            PrivateKeyProtection::PasswordFile("pw".into())
        );
        assert!(!plan.generates_key());
    }

    #[test]
    fn test_empty_token_mints() {
        let flags = CertificateFlags {
            token: Some(String::new()),
            provisioner_password_file: Some("prov.txt".into()),
            ..Default::default()
        };
        let plan = IssuePlan::from_flags(flags, now()).unwrap();
        assert_eq!(
            plan.token,
            TokenSource::Mint {
                provisioner_password_file: Some("prov.txt".into())
            }
        );
    }

    #[test]
    fn test_plaintext_protection() {
        let flags = CertificateFlags {
            no_password: true,
            insecure: true,
            ..Default::default()
        };
        let plan = IssuePlan::from_flags(flags, now()).unwrap();
        assert_eq!(plan.protection, PrivateKeyProtection::Plaintext);
    }

    #[test]
    fn test_add_user_profile() {
        let flags = CertificateFlags {
            add_user: true,
            principals: vec!["mariano".into()],
            ..Default::default()
        };
        let plan = IssuePlan::from_flags(flags, now()).unwrap();
        assert!(plan.profile.add_user());
        assert_eq!(plan.cert_type(), CertType::User);
    }

    #[test]
    fn test_conflicts_rejected_before_time_parsing() {
        let flags = CertificateFlags {
            host: true,
            add_user: true,
            not_before: Some("garbage".into()),
            ..Default::default()
        };
        assert_eq!(
            IssuePlan::from_flags(flags, now()),
            Err(ValidationError::HostWithAddUser)
        );
    }

    #[test]
    fn test_validity_bounds_resolved() {
        let flags = CertificateFlags {
            not_before: Some("-5m".into()),
            not_after: Some("2024-05-02T12:00:00Z".into()),
            ..Default::default()
        };
        let plan = IssuePlan::from_flags(flags, now()).unwrap();
        assert_eq!(plan.validity.valid_after, Some(now() - TimeDelta::minutes(5)));
        assert_eq!(
            plan.validity.valid_before,
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_time_rejected() {
        let flags = CertificateFlags {
            not_after: Some("next week".into()),
            ..Default::default()
        };
        assert_eq!(
            IssuePlan::from_flags(flags, now()),
            Err(ValidationError::InvalidTime {
                flag: "not-after",
                value: "next week".into()
            })
        );
    }

    #[test]
    fn test_empty_window_rejected() {
        let flags = CertificateFlags {
            not_before: Some("1h".into()),
            not_after: Some("30m".into()),
            ..Default::default()
        };
        assert_eq!(
            IssuePlan::from_flags(flags, now()),
            Err(ValidationError::EmptyValidityWindow)
        );
    }
}
