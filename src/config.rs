use std::env;
use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_ACCESS_TTL: &str = "1h";
const DEFAULT_REFRESH_TTL: &str = "7d";
/// Upper bound for token lifetimes: ten years.
pub const MAX_EXPIRY_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Signing material for the two token kinds.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl: i64,
    pub refresh_secret: String,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl: i64,
}

/// Credentials of one OAuth client registration.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    /// Public origin of this server, used to build picture URLs.
    pub backend_domain: String,
    /// The single origin allowed by CORS and targeted by the OAuth popup.
    pub frontend_domain: String,
    pub uploads_dir: PathBuf,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub google: Option<OAuthClientConfig>,
    pub microsoft: Option<OAuthClientConfig>,
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Configuration(format!("{} must be set", key)))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

fn oauth_client(prefix: &str) -> Option<OAuthClientConfig> {
    Some(OAuthClientConfig {
        client_id: optional(&format!("{}_CLIENT_ID", prefix))?,
        client_secret: optional(&format!("{}_CLIENT_SECRET", prefix))?,
        redirect_url: optional(&format!("{}_REDIRECT_URL", prefix))?,
    })
}

/// Parses an expiry such as `90`, `30s`, `15m`, `1h` or `7d` into seconds. Lifetimes above
/// [`MAX_EXPIRY_SECONDS`] are rejected.
pub fn parse_expiry(raw: &str) -> Result<i64, AppError> {
    let raw = raw.trim();
    let invalid = || AppError::Configuration(format!("invalid expiry: {:?}", raw));

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        Some(_) => (raw, 's'),
        None => return Err(invalid()),
    };
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return Err(invalid()),
    };
    amount
        .checked_mul(multiplier)
        .filter(|seconds| *seconds <= MAX_EXPIRY_SECONDS)
        .ok_or_else(invalid)
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let server_port = parse_var("BACKEND_PORT", 3000u16)?;
        let backend_domain = optional("BACKEND_DOMAIN")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));

        let jwt = JwtConfig {
            access_secret: required("JWT_SECRET")?,
            access_ttl: parse_expiry(
                &optional("JWT_SECRET_EXPIRE_IN").unwrap_or_else(|| DEFAULT_ACCESS_TTL.into()),
            )?,
            refresh_secret: required("JWT_SECRET_REFRESH")?,
            refresh_ttl: parse_expiry(
                &optional("JWT_REFRESH_EXPIRE_IN").unwrap_or_else(|| DEFAULT_REFRESH_TTL.into()),
            )?,
        };
        if jwt.access_secret == jwt.refresh_secret {
            log::warn!(
                "JWT_SECRET and JWT_SECRET_REFRESH are identical; \
                 refresh tokens will pass as access tokens"
            );
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            backend_domain: backend_domain.trim_end_matches('/').to_string(),
            frontend_domain: optional("FRONTEND_DOMAIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string())
                .trim_end_matches('/')
                .to_string(),
            uploads_dir: PathBuf::from(
                optional("UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string()),
            ),
            jwt,
            bcrypt_cost: parse_var("BCRYPT_COST", 10u32)?,
            google: oauth_client("GOOGLE"),
            microsoft: oauth_client("MICROSOFT"),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
