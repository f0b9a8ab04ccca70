//! Flag-combination validation.
//!
//! Conflicts are checked against an ordered table; the first matching rule
//! wins, so precedence is fixed by table order.

use std::path::PathBuf;

/// Raw option values of one `ssh-certificate` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateFlags {
    /// Pre-minted one-time token.
    pub token: Option<String>,
    pub principals: Vec<String>,
    pub host: bool,
    pub sign: bool,
    pub add_user: bool,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
    pub password_file: Option<PathBuf>,
    pub provisioner_password_file: Option<PathBuf>,
    pub no_password: bool,
    pub insecure: bool,
}

impl CertificateFlags {
    /// The `--token` value, where an empty string counts as absent.
    #[must_use]
    pub fn provided_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A rejected flag combination or option value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("flag '--no-password' requires the '--insecure' flag")]
    NoPasswordRequiresInsecure,

    #[error("flag '--no-password' is incompatible with '--password-file'")]
    NoPasswordWithPasswordFile,

    #[error("flag '--token' is incompatible with '--provisioner-password-file'")]
    TokenWithProvisionerPasswordFile,

    #[error("flag '--host' is incompatible with '--add-user'")]
    HostWithAddUser,

    #[error("flag '--add-user' is incompatible with more than one principal")]
    AddUserWithMultiplePrincipals,

    #[error("invalid value '{value}' for flag '--{flag}': expected an RFC 3339 time or a duration like 5m or -1h")]
    InvalidTime { flag: &'static str, value: String },

    #[error("flag '--not-after' must be later than '--not-before'")]
    EmptyValidityWindow,
}

type Rule = (fn(&CertificateFlags) -> bool, ValidationError);

/// Conflicts in precedence order.
const RULES: [Rule; 5] = [
    (
        no_password_without_insecure,
        ValidationError::NoPasswordRequiresInsecure,
    ),
    (
        no_password_with_password_file,
        ValidationError::NoPasswordWithPasswordFile,
    ),
    (
        token_with_provisioner_password,
        ValidationError::TokenWithProvisionerPasswordFile,
    ),
    (host_with_add_user, ValidationError::HostWithAddUser),
    (
        add_user_with_many_principals,
        ValidationError::AddUserWithMultiplePrincipals,
    ),
];

fn no_password_without_insecure(f: &CertificateFlags) -> bool {
    f.no_password && !f.insecure
}

fn no_password_with_password_file(f: &CertificateFlags) -> bool {
    f.no_password && f.password_file.is_some()
}

fn token_with_provisioner_password(f: &CertificateFlags) -> bool {
    f.provided_token().is_some() && f.provisioner_password_file.is_some()
}

fn host_with_add_user(f: &CertificateFlags) -> bool {
    f.host && f.add_user
}

fn add_user_with_many_principals(f: &CertificateFlags) -> bool {
    f.add_user && f.principals.len() > 1
}

/// Check flag combinations, returning the first conflict in table order.
///
/// # Errors
///
/// Returns the `ValidationError` of the first matching rule.
pub fn validate(flags: &CertificateFlags) -> Result<(), ValidationError> {
    match RULES.iter().find(|(conflicts, _)| conflicts(flags)) {
        Some((_, error)) => Err(error.clone()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> CertificateFlags {
        CertificateFlags::default()
    }

    #[test]
    fn test_defaults_accepted() {
        assert_eq!(validate(&flags()), Ok(()));
    }

    #[test]
    fn test_valid_combinations_accepted() {
        let valid = [
            CertificateFlags {
                no_password: true,
                insecure: true,
                ..flags()
            },
            CertificateFlags {
                password_file: Some("pass.txt".into()),
                ..flags()
            },
            CertificateFlags {
                token: Some("ott".into()),
                principals: vec!["a".into(), "b".into()],
                host: true,
                sign: true,
                ..flags()
            },
            CertificateFlags {
                provisioner_password_file: Some("prov.txt".into()),
                add_user: true,
                principals: vec!["only".into()],
                ..flags()
            },
            CertificateFlags {
                insecure: true,
                add_user: true,
                sign: true,
                ..flags()
            },
        ];

        for f in &valid {
            assert_eq!(validate(f), Ok(()), "{f:?} should be accepted");
        }
    }

    #[test]
    fn test_each_conflict_rejected() {
        let cases = [
            (
                CertificateFlags {
                    no_password: true,
                    ..flags()
                },
                ValidationError::NoPasswordRequiresInsecure,
            ),
            (
                CertificateFlags {
                    no_password: true,
                    insecure: true,
                    password_file: Some("pass.txt".into()),
                    ..flags()
                },
                ValidationError::NoPasswordWithPasswordFile,
            ),
            (
                CertificateFlags {
                    token: Some("ott".into()),
                    provisioner_password_file: Some("prov.txt".into()),
                    ..flags()
                },
                ValidationError::TokenWithProvisionerPasswordFile,
            ),
            (
                CertificateFlags {
                    host: true,
                    add_user: true,
                    ..flags()
                },
                ValidationError::HostWithAddUser,
            ),
            (
                CertificateFlags {
                    add_user: true,
                    principals: vec!["a".into(), "b".into()],
                    ..flags()
                },
                ValidationError::AddUserWithMultiplePrincipals,
            ),
        ];

        for (f, expected) in cases {
            assert_eq!(validate(&f), Err(expected));
        }
    }

    #[test]
    fn test_empty_token_is_absent() {
        let f = CertificateFlags {
            token: Some(String::new()),
            provisioner_password_file: Some("prov.txt".into()),
            ..flags()
        };
        assert_eq!(f.provided_token(), None);
        assert_eq!(validate(&f), Ok(()));
    }

    #[test]
    fn test_precedence_follows_table_order() {
        // Every conflict at once: the first rule is reported
        let everything = CertificateFlags {
            no_password: true,
            password_file: Some("pass.txt".into()),
            token: Some("ott".into()),
            provisioner_password_file: Some("prov.txt".into()),
            host: true,
            add_user: true,
            principals: vec!["a".into(), "b".into()],
            ..flags()
        };
        assert_eq!(
            validate(&everything),
            Err(ValidationError::NoPasswordRequiresInsecure)
        );

        let without_first = CertificateFlags {
            insecure: true,
            ..everything.clone()
        };
        assert_eq!(
            validate(&without_first),
            Err(ValidationError::NoPasswordWithPasswordFile)
        );

        let host_and_principals = CertificateFlags {
            host: true,
            add_user: true,
            principals: vec!["a".into(), "b".into()],
            ..flags()
        };
        assert_eq!(
            validate(&host_and_principals),
            Err(ValidationError::HostWithAddUser)
        );
    }

    #[test]
    fn test_validation_is_deterministic() {
        let f = CertificateFlags {
            add_user: true,
            principals: vec!["a".into(), "b".into()],
            ..flags()
        };
        let first = validate(&f);
        for _ in 0..10 {
            assert_eq!(validate(&f), first);
        }
    }
}
