#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use taskdeck::auth::{OAuthProfile, OAuthProvider, OAuthProviders};
use taskdeck::config::{Config, JwtConfig};
use taskdeck::store::{InMemoryTaskStore, InMemoryUserStore};
use taskdeck::{AppError, AppState};

pub const FRONTEND: &str = "http://localhost:5173";
pub const BACKEND: &str = "http://localhost:3000";
pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

const BOUNDARY: &str = "----taskdeck-test-boundary";

/// Builds an app around `$state` with the same middleware stack as the server.
macro_rules! test_app {
    ($state:expr) => {{
        let state = $state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(taskdeck::envelope::ErrorEnvelope)
                .wrap(actix_web::middleware::Logger::default())
                .configure(move |cfg| taskdeck::routes::config(cfg, &state)),
        )
        .await
    }};
}

pub fn uploads_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "taskdeck-test-{}",
        taskdeck::uploads::unique_file_name("")
    ))
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        server_port: 3000,
        server_host: "127.0.0.1".into(),
        backend_domain: BACKEND.into(),
        frontend_domain: FRONTEND.into(),
        uploads_dir: uploads_dir(),
        jwt: JwtConfig {
            access_secret: ACCESS_SECRET.into(),
            access_ttl: 3600,
            refresh_secret: REFRESH_SECRET.into(),
            refresh_ttl: 7 * 24 * 3600,
        },
        bcrypt_cost: 4,
        google: None,
        microsoft: None,
    }
}

/// Provider stand-in: the code `ok:<email>` signs in as `<email>`, anything else fails.
pub struct FakeProvider {
    pub name: &'static str,
}

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn authorize_url(&self) -> Result<String, AppError> {
        Ok(format!("https://{}.test/authorize?client_id=fake", self.name))
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, AppError> {
        match code.strip_prefix("ok:") {
            Some(email) => Ok(OAuthProfile {
                email: email.to_string(),
                full_name: "Oauth Person".into(),
                picture: Some(format!("https://{}.test/avatar.png", self.name)),
            }),
            None => Err(AppError::Unauthorized(format!(
                "{} authentication failed",
                self.name
            ))),
        }
    }
}

pub fn fake_providers() -> OAuthProviders {
    OAuthProviders {
        google: Some(Arc::new(FakeProvider { name: "google" })),
        microsoft: Some(Arc::new(FakeProvider { name: "microsoft" })),
    }
}

/// Static files are mounted from the uploads directory, so it has to exist first.
pub fn state_with(oauth: OAuthProviders) -> AppState {
    let config = test_config();
    std::fs::create_dir_all(&config.uploads_dir).expect("create uploads dir");
    AppState::new(
        &config,
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryTaskStore::new()),
        oauth,
    )
}

pub fn state() -> AppState {
    state_with(fake_providers())
}

/// A `multipart/form-data` body with a JSON `data` field and an optional picture file.
/// Returns the content type and the body.
pub fn register_form(data: &Value, picture: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\n\
             Content-Disposition: form-data; name=\"data\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {}\r\n",
            BOUNDARY, data
        )
        .as_bytes(),
    );
    if let Some((filename, bytes)) = picture {
        body.extend_from_slice(
            format!(
                "--{}\r\n\
                 Content-Disposition: form-data; name=\"picture\"; filename=\"{}\"\r\n\
                 Content-Type: image/png\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn user_payload(email: &str, password: &str) -> Value {
    serde_json::json!({
        "email": email,
        "password": password,
        "fullName": "Test User"
    })
}
