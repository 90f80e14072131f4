//! Password hashing and session tokens.

use anyhow::anyhow;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::{NausError, NausResult};
use crate::models::admin::Admin;
use crate::models::credential::Credential;
use crate::util::current_time;

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> NausResult<String>;
    fn verify(&self, password: &str, hash: &str) -> NausResult<bool>;
}

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> NausResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|err| anyhow!("Failed to hash password: {}", err).into())
    }

    fn verify(&self, password: &str, hash: &str) -> NausResult<bool> {
        bcrypt::verify(password, hash)
            .map_err(|err| anyhow!("Failed to verify password: {}", err).into())
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Member,
    Admin,
}

/// Who a token was issued to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: i32,
    pub email: String,
    pub kind: PrincipalKind,
    pub role: String,
}

impl Principal {
    pub fn member(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            email: credential.email.clone(),
            kind: PrincipalKind::Member,
            role: "member".to_owned(),
        }
    }

    pub fn admin(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            kind: PrincipalKind::Admin,
            role: admin.role.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub kind: PrincipalKind,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct Tokener {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl Tokener {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, principal: &Principal) -> NausResult<String> {
        let now = current_time();
        let claims = Claims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            kind: principal.kind,
            role: principal.role.clone(),
            exp: (now + self.ttl).unix_timestamp(),
            iat: now.unix_timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| anyhow!("Failed to sign token: {}", err).into())
    }

    pub fn verify(&self, token: &str) -> NausResult<Principal> {
        let invalid = || NausError::Unauthorized("Invalid or expired token".to_owned());
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| invalid())?
            .claims;

        Ok(Principal {
            id: claims.sub.parse().map_err(|_| invalid())?,
            email: claims.email,
            kind: claims.kind,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            id: 7,
            email: "a@x.com".to_owned(),
            kind: PrincipalKind::Member,
            role: "member".to_owned(),
        }
    }

    #[test]
    fn tokens_round_trip() {
        let tokener = Tokener::new("test_secret_key", Duration::hours(1));
        let token = tokener.issue(&principal()).unwrap();

        assert_eq!(tokener.verify(&token).unwrap(), principal());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = Tokener::new("secret1", Duration::hours(1))
            .issue(&principal())
            .unwrap();
        let result = Tokener::new("secret2", Duration::hours(1)).verify(&token);

        assert!(matches!(result, Err(NausError::Unauthorized(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokener = Tokener::new("test_secret_key", Duration::hours(-2));
        let token = tokener.issue(&principal()).unwrap();

        assert!(tokener.verify(&token).is_err());
    }

    #[test]
    fn bcrypt_verifies_its_own_hashes() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("hunter22").unwrap();

        assert!(hasher.verify("hunter22", &hash).unwrap());
        assert!(!hasher.verify("hunter23", &hash).unwrap());
    }
}
