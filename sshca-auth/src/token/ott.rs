//! Compact JWS one-time tokens.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::request::{CertType, TokenRequest};
use crate::validity::format_bound;

use super::{decoding_key, ProvisionerKey, TokenError};

/// Seconds a freshly minted token stays valid.
pub const TOKEN_LIFETIME_SECS: i64 = 300;

/// Registered claims plus the SSH-specific `step` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Provisioner name.
    pub iss: String,
    /// Sign endpoint the token is valid for.
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub step: StepClaims,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepClaims {
    pub ssh: SshClaims,
}

/// Certificate parameters the token authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshClaims {
    pub cert_type: CertType,
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub principals: Vec<String>,
    /// RFC 3339, empty when unset.
    pub valid_after: String,
    pub valid_before: String,
}

impl TokenClaims {
    /// Claims authorizing `request`, issued at `now`.
    #[must_use]
    pub fn for_ssh(
        provisioner: &str,
        audience: &str,
        request: &TokenRequest,
        now: DateTime<Utc>,
    ) -> Self {
        let mut jti = [0u8; 16];
        OsRng.fill_bytes(&mut jti);

        let iat = now.timestamp();
        Self {
            iss: provisioner.to_string(),
            aud: audience.to_string(),
            sub: request.subject.clone(),
            iat,
            nbf: iat,
            exp: iat + TOKEN_LIFETIME_SECS,
            jti: BASE64_URL_SAFE_NO_PAD.encode(jti),
            step: StepClaims {
                ssh: SshClaims {
                    cert_type: request.cert_type,
                    key_id: request.subject.clone(),
                    principals: request.principals.clone(),
                    valid_after: format_bound(request.validity.valid_after),
                    valid_before: format_bound(request.validity.valid_before),
                },
            },
        }
    }
}

/// A signed, encoded one-time token.
#[derive(Clone)]
pub struct OneTimeToken {
    encoded: String,
    claims: TokenClaims,
}

impl std::fmt::Debug for OneTimeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneTimeToken")
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl OneTimeToken {
    /// Sign `claims` with the provisioner key.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the key or claims cannot be encoded.
    pub fn mint(key: &ProvisionerKey, claims: TokenClaims) -> Result<Self, TokenError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(key.key_id().to_string());

        let encoded = jsonwebtoken::encode(&header, &claims, &key.encoding_key()?)
            .map_err(|_| TokenError::Encoding)?;
        Ok(Self { encoded, claims })
    }

    /// Decode and verify a token against the provisioner's public key.
    ///
    /// Time claims are checked against `now`, after the signature.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` for undecodable input,
    /// `TokenError::InvalidSignature` if the signature fails, then
    /// `TokenError::NotYetValid` or `TokenError::Expired`.
    pub fn verify(
        encoded: &str,
        key: &VerifyingKey,
        now: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        let header = jsonwebtoken::decode_header(encoded).map_err(|_| TokenError::Malformed)?;
        if header.alg != Algorithm::EdDSA {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let data = jsonwebtoken::decode::<TokenClaims>(encoded, &decoding_key(key)?, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;

        let claims = data.claims;
        let now = now.timestamp();
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(Self {
            encoded: encoded.to_string(),
            claims,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.encoded
    }

    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validity::ValidityWindow;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn request() -> TokenRequest {
        TokenRequest {
            subject: "mariano@work".to_string(),
            cert_type: CertType::User,
            principals: vec!["mariano".to_string()],
            validity: ValidityWindow {
                valid_after: None,
                valid_before: Some(now() + TimeDelta::hours(8)),
            },
        }
    }

    fn mint(key: &ProvisionerKey) -> OneTimeToken {
        let claims = TokenClaims::for_ssh(
            "admin@example.com",
            "https://ca.example.com/1.0/ssh/sign",
            &request(),
            now(),
        );
        OneTimeToken::mint(key, claims).unwrap()
    }

    #[test]
    fn test_claims_bind_request() {
        let claims = TokenClaims::for_ssh("prov", "aud", &request(), now());
        assert_eq!(claims.sub, "mariano@work");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_SECS);
        assert_eq!(claims.step.ssh.key_id, "mariano@work");
        assert_eq!(claims.step.ssh.principals, vec!["mariano"]);
        assert_eq!(claims.step.ssh.valid_after, "");
        assert_eq!(claims.step.ssh.valid_before, "2024-05-01T20:00:00Z");
    }

    #[test]
    fn test_claims_wire_names() {
        let claims = TokenClaims::for_ssh("prov", "aud", &request(), now());
        let json = serde_json::to_value(&claims).unwrap();
        let ssh = &json["step"]["ssh"];
        assert_eq!(ssh["certType"], "user");
        assert_eq!(ssh["keyID"], "mariano@work");
        assert!(ssh.get("validBefore").is_some());
    }

    #[test]
    fn test_jti_is_unique() {
        let a = TokenClaims::for_ssh("prov", "aud", &request(), now());
        let b = TokenClaims::for_ssh("prov", "aud", &request(), now());
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_mint_then_verify() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let token = mint(&key);
        assert_eq!(token.as_str().split('.').count(), 3);

        let verified = OneTimeToken::verify(token.as_str(), &key.verifying_key(), now()).unwrap();
        assert_eq!(verified.claims(), token.claims());
    }

    #[test]
    fn test_header_carries_key_id() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let token = mint(&key);
        let header = jsonwebtoken::decode_header(token.as_str()).unwrap();
        assert_eq!(header.alg, Algorithm::EdDSA);
        assert_eq!(header.kid.as_deref(), Some(key.key_id()));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let other = ProvisionerKey::from_seed(&[10u8; 32]);
        let token = mint(&key);
        assert_eq!(
            OneTimeToken::verify(token.as_str(), &other.verifying_key(), now()).err(),
            Some(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let other = ProvisionerKey::from_seed(&[10u8; 32]);
        let token = mint(&key);
        let later = now() + TimeDelta::hours(1);

        assert_eq!(
            OneTimeToken::verify(token.as_str(), &other.verifying_key(), later).err(),
            Some(TokenError::InvalidSignature)
        );
        assert_eq!(
            OneTimeToken::verify(token.as_str(), &key.verifying_key(), later).err(),
            Some(TokenError::Expired)
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let token = mint(&key);
        let earlier = now() - TimeDelta::minutes(1);
        assert_eq!(
            OneTimeToken::verify(token.as_str(), &key.verifying_key(), earlier).err(),
            Some(TokenError::NotYetValid)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let token = mint(&key);
        let parts: Vec<&str> = token.as_str().split('.').collect();

        let mut claims = token.claims().clone();
        claims.step.ssh.principals = vec!["root".to_string()];
        let forged = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(
            OneTimeToken::verify(&tampered, &key.verifying_key(), now()).err(),
            Some(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        let claims = TokenClaims::for_ssh("prov", "aud", &request(), now());
        let hmac = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"provisioner password"),
        )
        .unwrap();
        assert_eq!(
            OneTimeToken::verify(&hmac, &key.verifying_key(), now()).err(),
            Some(TokenError::UnsupportedAlgorithm("HS256".to_string()))
        );
    }

    #[test]
    fn test_malformed_rejected() {
        let key = ProvisionerKey::from_seed(&[9u8; 32]);
        for bad in ["", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert_eq!(
                OneTimeToken::verify(bad, &key.verifying_key(), now()).err(),
                Some(TokenError::Malformed),
                "{bad:?}"
            );
        }
    }
}
