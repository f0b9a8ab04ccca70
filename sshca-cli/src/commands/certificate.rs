//! SSH certificate issuance.
//!
//! Runs one validated [`IssuePlan`]:
//! 1. Resolve principals
//! 2. Acquire a token (provided or minted)
//! 3. Load or generate key material, plus the add-user identity
//! 4. One signing exchange, checked against the request
//! 5. Write artifacts
//! 6. Best-effort agent registration

use std::error::Error;
use std::path::{Path, PathBuf};

use sshca_auth::identity::{parse_authorized_key, KeyPair};
use sshca_auth::layout::provisioner_comment;
use chrono::{DateTime, Utc};
use sshca_auth::{
    resolve_principals, ArtifactLayout, CertificateFlags, CertificateRequest, IssuePlan, KeySource,
    PrivateKeyProtection, SignRequest, TokenRequest,
};
use zeroize::Zeroizing;

use crate::agent::Agent;
use crate::ca::{AuthorityError, CertificateAuthority};
use crate::error::{CertificateError, KeyFileError};
use crate::provisioner::{acquire_token, TokenMinter};
use crate::secret::{obtain_password, PasswordPrompt, ENCRYPT_PROMPT};
use crate::writer::{Artifact, ArtifactWriter};

/// What to issue a certificate for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTarget {
    /// Identity label: key ID, token subject and file comment.
    pub subject: String,
    /// Private key to create, or public key to sign.
    pub key_file: PathBuf,
}

/// External services one issuance talks to.
pub struct Collaborators<'a> {
    pub authority: &'a dyn CertificateAuthority,
    pub minter: &'a dyn TokenMinter,
    pub prompt: &'a dyn PasswordPrompt,
    pub agent: &'a dyn Agent,
}

/// Outcome of agent registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStatus {
    Added,
    /// No private key was created in this run.
    Skipped,
    Failed(String),
}

/// Everything a successful issuance produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReport {
    /// Main identity files, in write order.
    pub artifacts: Vec<Artifact>,
    pub agent: AgentStatus,
    /// Add-user identity files, in write order.
    pub provisioner_artifacts: Vec<Artifact>,
}

/// Check option values and fix the plan, before any I/O.
///
/// # Errors
///
/// Returns `CertificateError::Validation` for the first conflicting flag
/// combination or a malformed validity window.
pub fn plan_issuance(
    flags: CertificateFlags,
    now: DateTime<Utc>,
) -> Result<IssuePlan, CertificateError> {
    Ok(IssuePlan::from_flags(flags, now)?)
}

/// Run an issuance plan to completion.
///
/// # Errors
///
/// Returns the first fatal `CertificateError`. Files written before a
/// persistence failure are left in place.
pub async fn issue_certificate(
    plan: &IssuePlan,
    target: &IssueTarget,
    deps: &Collaborators<'_>,
) -> Result<IssueReport, CertificateError> {
    let subject = target.subject.as_str();
    let layout = ArtifactLayout::new(&target.key_file, plan.key_source);
    let cert_type = plan.cert_type();
    let principals = resolve_principals(subject, cert_type, &plan.principals);
    tracing::debug!(subject, %cert_type, ?principals, "resolved principals");

    let token_request = TokenRequest {
        subject: subject.to_string(),
        cert_type,
        principals: principals.clone(),
        validity: plan.validity,
    };
    let token = acquire_token(&plan.token, deps.minter, &token_request)?;

    let (key_pair, public_key) = match plan.key_source {
        KeySource::Sign => (None, read_public_key(layout.key_file())?),
        KeySource::Generate => {
            let pair = KeyPair::generate().map_err(CertificateError::KeyGeneration)?;
            let public_key = pair
                .public_key_bytes()
                .map_err(CertificateError::KeyGeneration)?;
            tracing::debug!(fingerprint = %pair.fingerprint(), "generated key pair");
            (Some(pair), public_key)
        }
    };

    let auxiliary = if plan.profile.add_user() {
        let pair = KeyPair::generate().map_err(CertificateError::KeyGeneration)?;
        let public_key = pair
            .public_key_bytes()
            .map_err(CertificateError::KeyGeneration)?;
        Some((pair, public_key))
    } else {
        None
    };

    let request = SignRequest {
        token,
        request: CertificateRequest {
            subject: subject.to_string(),
            cert_type,
            principals,
            validity: plan.validity,
            public_key,
            auxiliary_public_key: auxiliary.as_ref().map(|(_, key)| key.clone()),
        },
    };
    let response = deps.authority.sign_ssh(&request).await?;
    response
        .check_against(&request.request)
        .map_err(AuthorityError::from)?;
    tracing::debug!("certificate received");

    let mut writer = ArtifactWriter::new();
    if let Some(pair) = &key_pair {
        let password = private_key_password(&plan.protection, deps.prompt)?;
        writer.private_key(
            "Private Key",
            &layout.private_key(),
            pair,
            subject,
            password.as_ref().map(|p| p.as_bytes()),
        )?;
        writer.authorized_key(
            "Public Key",
            &layout.public_key(),
            &request.request.public_key,
            subject,
        )?;
    }
    writer.authorized_key(
        "Certificate",
        &layout.certificate(),
        &response.certificate,
        subject,
    )?;

    let primary = writer.written().len();
    if let (Some((pair, public_key)), Some(certificate)) =
        (&auxiliary, &response.auxiliary_certificate)
    {
        let comment = provisioner_comment(subject);
        writer.private_key(
            "Provisioner Private Key",
            &layout.provisioner_private_key(),
            pair,
            &comment,
            None,
        )?;
        writer.authorized_key(
            "Provisioner Public Key",
            &layout.provisioner_public_key(),
            public_key,
            &comment,
        )?;
        writer.authorized_key(
            "Provisioner Certificate",
            &layout.provisioner_certificate(),
            certificate,
            &comment,
        )?;
    }

    let mut artifacts = writer.into_artifacts();
    let provisioner_artifacts = artifacts.split_off(primary);

    let agent = register_with_agent(
        deps.agent,
        key_pair.as_ref(),
        &response.certificate,
        subject,
    )
    .await;

    Ok(IssueReport {
        artifacts,
        agent,
        provisioner_artifacts,
    })
}

/// Read and parse the public key to be signed.
fn read_public_key(path: &Path) -> Result<Vec<u8>, CertificateError> {
    let key_error = |source: KeyFileError| CertificateError::KeyMaterial {
        path: path.to_path_buf(),
        source,
    };

    let text = std::fs::read_to_string(path).map_err(|e| key_error(e.into()))?;
    let key = parse_authorized_key(&text).map_err(|e| key_error(e.into()))?;
    key.to_bytes()
        .map_err(|e| key_error(KeyFileError::Parse(sshca_auth::KeyError::Encoding(e))))
}

fn private_key_password(
    protection: &PrivateKeyProtection,
    prompt: &dyn PasswordPrompt,
) -> Result<Option<Zeroizing<String>>, CertificateError> {
    let password = match protection {
        PrivateKeyProtection::Plaintext => return Ok(None),
        PrivateKeyProtection::PasswordFile(path) => {
            obtain_password(Some(path.as_path()), prompt, ENCRYPT_PROMPT)?
        }
        PrivateKeyProtection::Prompt => obtain_password(None, prompt, ENCRYPT_PROMPT)?,
    };
    Ok(Some(password))
}

async fn register_with_agent(
    agent: &dyn Agent,
    key: Option<&KeyPair>,
    certificate: &[u8],
    comment: &str,
) -> AgentStatus {
    let Some(key) = key else {
        return AgentStatus::Skipped;
    };

    match agent.add_certified_key(key, certificate, comment).await {
        Ok(()) => AgentStatus::Added,
        Err(e) => {
            let reason = error_chain(&e);
            tracing::warn!("failed to add key to ssh-agent: {reason}");
            AgentStatus::Failed(reason)
        }
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(error: &dyn Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
