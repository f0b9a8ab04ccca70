//! Principal resolution.

use crate::request::CertType;

/// Turn an identity label into a bare SSH user name.
///
/// Everything from the last `@` onward is dropped, so `mariano@work`
/// becomes `mariano`. Labels without `@` are returned unchanged.
#[must_use]
pub fn sanitize_user_principal(subject: &str) -> String {
    match subject.rfind('@') {
        Some(i) => subject[..i].to_string(),
        None => subject.to_string(),
    }
}

/// Resolve the principals a certificate is requested for.
///
/// Explicit principals are returned as given, in order. Without them a host
/// certificate uses the subject verbatim and a user certificate uses the
/// sanitized subject.
#[must_use]
pub fn resolve_principals(subject: &str, cert_type: CertType, explicit: &[String]) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    match cert_type {
        CertType::Host => vec![subject.to_string()],
        CertType::User => vec![sanitize_user_principal(subject)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_subject_domain_stripped() {
        assert_eq!(
            resolve_principals("mariano@work", CertType::User, &[]),
            vec!["mariano"]
        );
    }

    #[test]
    fn test_host_subject_verbatim() {
        assert_eq!(
            resolve_principals("mariano@work", CertType::Host, &[]),
            vec!["mariano@work"]
        );
        assert_eq!(
            resolve_principals("internal.example.com", CertType::Host, &[]),
            vec!["internal.example.com"]
        );
    }

    #[test]
    fn test_explicit_principals_pass_through_in_order() {
        let explicit = vec!["max".to_string(), "mariano".to_string(), "max".to_string()];
        assert_eq!(
            resolve_principals("ops@work", CertType::User, &explicit),
            explicit
        );
        assert_eq!(
            resolve_principals("ops@work", CertType::Host, &explicit),
            explicit
        );
    }

    #[test]
    fn test_sanitize_uses_last_at() {
        assert_eq!(sanitize_user_principal("a@b@example.com"), "a@b");
        assert_eq!(sanitize_user_principal("plain"), "plain");
        assert_eq!(sanitize_user_principal("@domain"), "");
    }
}
