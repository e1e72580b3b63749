// Login sessions (signed cookie) and password hashing

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SESSION_COOKIE: &str = "session_token";

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
// bcrypt's minimum cost
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("session token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Claims carried by the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub uid: i64,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 keys plus token lifetime, shared by login handlers and the auth gate.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, username: &str, uid: i64) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: username.to_string(),
            uid,
            iat: now,
            exp: now + self.ttl_secs,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// bcrypt hash (`$2b$...`) with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, HASH_COST)?)
}

/// Check `password` against a stored bcrypt hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::debug!(error = %e, "stored password hash rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password("password").unwrap();
        assert!(stored.starts_with("$2b$"));
        assert!(verify_password("password", &stored));
        assert!(!verify_password("Password", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn hashes_from_other_bcrypt_versions_verify() {
        let stored = bcrypt::hash_with_result("password", 4)
            .unwrap()
            .format_for_version(bcrypt::Version::TwoA);
        assert!(stored.starts_with("$2a$"));
        assert!(verify_password("password", &stored));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("password", "password"));
        assert!(!verify_password("password", "md5$abc$def"));
        assert!(!verify_password("password", "$2b$04$tooshort"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn session_token_round_trip() {
        let keys = SessionKeys::new("test-secret", 3600);
        let token = keys.issue("admin", 1).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.uid, 1);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = SessionKeys::new("one", 3600).issue("admin", 1).unwrap();
        assert!(SessionKeys::new("two", 3600).verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // beyond jsonwebtoken's default 60s leeway
        let keys = SessionKeys::new("test-secret", -600);
        let token = keys.issue("admin", 1).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
