use crate::config::JwtConfig;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Represents the claims encoded within both access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token, the user's id.
    pub sub: i32,
    pub email: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// A freshly signed access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

/// Why a token could not be signed.
#[derive(Debug)]
enum SignError {
    ExpiryOutOfRange(i64),
    Jwt(jsonwebtoken::errors::Error),
}

impl std::fmt::Display for SignError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SignError::ExpiryOutOfRange(seconds) => {
                write!(f, "expiry of {} seconds is out of range", seconds)
            }
            SignError::Jwt(e) => write!(f, "{}", e),
        }
    }
}

impl SigningKey {
    fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    fn sign(&self, user_id: i32, email: &str) -> Result<String, SignError> {
        let now = Utc::now();
        let exp = Duration::try_seconds(self.ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(SignError::ExpiryOutOfRange(self.ttl_seconds))?;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(SignError::Jwt)
    }

    fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

/// Signs and verifies tokens. Access and refresh tokens use separate secrets and lifetimes.
pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: SigningKey::new(&config.access_secret, config.access_ttl),
            refresh: SigningKey::new(&config.refresh_secret, config.refresh_ttl),
        }
    }

    /// Signs an access token and a refresh token carrying `{sub, email}`.
    pub fn issue_pair(&self, user_id: i32, email: &str) -> Result<TokenPair, AppError> {
        let sign = || -> Result<TokenPair, SignError> {
            Ok(TokenPair {
                access_token: self.access.sign(user_id, email)?,
                refresh_token: self.refresh.sign(user_id, email)?,
            })
        };
        sign().map_err(|e| {
            log::error!("failed to sign tokens for user {}: {}", user_id, e);
            AppError::BadRequest("Error generating tokens.".into())
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        self.access.verify(token).map_err(|e| {
            log::debug!("rejected access token: {}", e);
            AppError::Unauthorized("Invalid or expired token".into())
        })
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.refresh.verify(token).map_err(|e| {
            log::debug!("rejected refresh token: {}", e);
            AppError::Unauthorized("Invalid refresh token".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".into(),
            access_ttl: 3600,
            refresh_secret: "refresh-secret".into(),
            refresh_ttl: 7 * 24 * 3600,
        }
    }

    #[test]
    fn test_token_generation_and_verification() {
        let service = TokenService::new(&config());
        let pair = service.issue_pair(1, "a@example.com").unwrap();

        let claims = service.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);

        let claims = service.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let service = TokenService::new(&config());
        let pair = service.issue_pair(1, "a@example.com").unwrap();

        assert!(service.verify_access(&pair.refresh_token).is_err());
        match service.verify_refresh(&pair.access_token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Invalid refresh token"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_token_expiration() {
        let service = TokenService::new(&config());
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: 2,
            email: "b@example.com".into(),
            iat: past.timestamp(),
            exp: (past + Duration::hours(1)).timestamp(),
        };
        let expired = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("refresh-secret".as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service.verify_refresh(&expired),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_invalid_token_signature() {
        let other = TokenService::new(&JwtConfig {
            refresh_secret: "someone-else".into(),
            ..config()
        });
        let forged = other.issue_pair(3, "c@example.com").unwrap().refresh_token;

        let service = TokenService::new(&config());
        assert!(service.verify_refresh(&forged).is_err());
        assert!(service.verify_access("not.a.jwt").is_err());
    }

    #[test]
    fn test_unrepresentable_expiry_fails_instead_of_panicking() {
        let service = TokenService::new(&JwtConfig {
            refresh_ttl: 10_000_000_000_000,
            ..config()
        });
        match service.issue_pair(1, "a@example.com") {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Error generating tokens."),
            other => panic!("expected BadRequest, got {:?}", other),
        }

        let service = TokenService::new(&JwtConfig {
            access_ttl: i64::MAX,
            ..config()
        });
        assert!(service.issue_pair(1, "a@example.com").is_err());
    }
}
