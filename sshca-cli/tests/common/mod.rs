//! Shared harness for issuance tests.
//!
//! In-process fakes for every collaborator. The fake authority signs real
//! certificates with an Ed25519 CA key so artifacts can be parsed back.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::OsRng;
use ssh_key::certificate::{Builder, CertType as SshCertType};
use ssh_key::{Algorithm, PrivateKey, PublicKey};
use sshca_auth::identity::KeyPair;
use sshca_auth::{CertType, CertificateResponse, SignRequest, TokenRequest};
use sshca_cli::agent::{Agent, AgentError};
use sshca_cli::ca::{AuthorityError, CertificateAuthority};
use sshca_cli::commands::Collaborators;
use sshca_cli::provisioner::{ProvisionerError, TokenMinter};
use sshca_cli::secret::PasswordPrompt;
use zeroize::Zeroizing;

pub const MINTED_TOKEN: &str = "minted-token";
pub const PROMPT_PASSWORD: &str = "typed-password";

/// How the fake authority answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaBehavior {
    Sign,
    Reject,
    /// Certify a different key than the one submitted.
    WrongKey,
}

pub struct FakeAuthority {
    ca: PrivateKey,
    behavior: CaBehavior,
    requests: Mutex<Vec<SignRequest>>,
}

impl FakeAuthority {
    pub fn new(behavior: CaBehavior) -> Self {
        Self {
            ca: PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap(),
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> SignRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn certify(&self, public_key: &[u8], cert_type: CertType, principals: &[String]) -> Vec<u8> {
        let key = PublicKey::from_bytes(public_key).unwrap();
        let mut builder =
            Builder::new_with_random_nonce(&mut OsRng, key.key_data().clone(), 0, u64::MAX)
                .unwrap();
        builder
            .cert_type(match cert_type {
                CertType::User => SshCertType::User,
                CertType::Host => SshCertType::Host,
            })
            .unwrap();
        for principal in principals {
            builder.valid_principal(principal.as_str()).unwrap();
        }
        builder.sign(&self.ca).unwrap().to_bytes().unwrap()
    }
}

#[async_trait]
impl CertificateAuthority for FakeAuthority {
    async fn sign_ssh(&self, request: &SignRequest) -> Result<CertificateResponse, AuthorityError> {
        self.requests.lock().unwrap().push(request.clone());
        let req = &request.request;

        match self.behavior {
            CaBehavior::Reject => Err(AuthorityError::Rejected {
                status: 401,
                message: "invalid token".into(),
            }),
            CaBehavior::WrongKey => {
                let other = KeyPair::generate().unwrap().public_key_bytes().unwrap();
                Ok(CertificateResponse {
                    certificate: self.certify(&other, req.cert_type, &req.principals),
                    auxiliary_certificate: None,
                })
            }
            CaBehavior::Sign => Ok(CertificateResponse {
                certificate: self.certify(&req.public_key, req.cert_type, &req.principals),
                auxiliary_certificate: req
                    .auxiliary_public_key
                    .as_ref()
                    .map(|key| self.certify(key, CertType::User, &req.principals)),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeMinter {
    calls: AtomicUsize,
    last: Mutex<Option<TokenRequest>>,
}

impl FakeMinter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TokenRequest> {
        self.last.lock().unwrap().clone()
    }
}

impl TokenMinter for FakeMinter {
    fn mint(&self, request: &TokenRequest) -> Result<String, ProvisionerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(MINTED_TOKEN.to_string())
    }
}

#[derive(Default)]
pub struct FakePrompt {
    calls: AtomicUsize,
}

impl FakePrompt {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PasswordPrompt for FakePrompt {
    fn read_password(&self, _message: &str) -> io::Result<Zeroizing<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Zeroizing::new(PROMPT_PASSWORD.to_string()))
    }
}

pub struct FakeAgent {
    fail: bool,
    added: Mutex<Vec<String>>,
}

impl FakeAgent {
    pub fn accepting() -> Self {
        Self {
            fail: false,
            added: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            added: Mutex::new(Vec::new()),
        }
    }

    /// Comments of keys added so far.
    pub fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for FakeAgent {
    async fn add_certified_key(
        &self,
        _key: &KeyPair,
        _certificate: &[u8],
        comment: &str,
    ) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::NotRunning);
        }
        self.added.lock().unwrap().push(comment.to_string());
        Ok(())
    }
}

/// All fakes for one test.
pub struct Harness {
    pub authority: FakeAuthority,
    pub minter: FakeMinter,
    pub prompt: FakePrompt,
    pub agent: FakeAgent,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(CaBehavior::Sign, FakeAgent::accepting())
    }

    pub fn with(behavior: CaBehavior, agent: FakeAgent) -> Self {
        Self {
            authority: FakeAuthority::new(behavior),
            minter: FakeMinter::default(),
            prompt: FakePrompt::default(),
            agent,
        }
    }

    pub fn deps(&self) -> Collaborators<'_> {
        Collaborators {
            authority: &self.authority,
            minter: &self.minter,
            prompt: &self.prompt,
            agent: &self.agent,
        }
    }
}

/// Sorted file names in `dir`.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).unwrap().mode() & 0o777
}
