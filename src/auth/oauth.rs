//! Authorization-code sign-in with external identity providers.
//!
//! The routes only see the [`OAuthProvider`] trait: build the consent URL, then turn the
//! `code` the provider sends back into an [`OAuthProfile`]. [`HttpOAuthProvider`] speaks the
//! standard token + OIDC userinfo endpoints over `reqwest`.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::OAuthClientConfig;
use crate::error::AppError;

/// What the application keeps from a provider's userinfo response.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    pub email: String,
    pub full_name: String,
    pub picture: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name as used in the route, e.g. `google`.
    fn name(&self) -> &str;

    /// The consent page the browser is redirected to.
    fn authorize_url(&self) -> Result<String, AppError>;

    /// Exchanges an authorization code for the signed-in user's profile.
    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, AppError>;
}

/// Fixed endpoints of a provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    pub fn google() -> Self {
        Self {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token: "https://oauth2.googleapis.com/token".into(),
            userinfo: "https://openidconnect.googleapis.com/v1/userinfo".into(),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        }
    }

    pub fn microsoft() -> Self {
        Self {
            authorize: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize".into(),
            token: "https://login.microsoftonline.com/common/oauth2/v2.0/token".into(),
            userinfo: "https://graph.microsoft.com/oidc/userinfo".into(),
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

/// Column limits of `users.full_name` and `users.email`.
const MAX_FULL_NAME_CHARS: usize = 100;
const MAX_EMAIL_CHARS: usize = 255;

impl UserInfo {
    fn into_profile(self) -> Result<OAuthProfile, AppError> {
        let email = self
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("Provider did not share an email address".into())
            })?;
        if email.chars().count() > MAX_EMAIL_CHARS {
            return Err(AppError::Unauthorized("Provider email address is too long".into()));
        }

        let full_name = match self.name.filter(|name| !name.trim().is_empty()) {
            Some(name) => name,
            None => {
                let parts: Vec<String> = [self.given_name, self.family_name]
                    .into_iter()
                    .flatten()
                    .collect();
                if parts.is_empty() {
                    email.clone()
                } else {
                    parts.join(" ")
                }
            }
        };
        let full_name: String = full_name.trim().chars().take(MAX_FULL_NAME_CHARS).collect();

        Ok(OAuthProfile {
            email,
            full_name,
            picture: self.picture,
        })
    }
}

fn provider_failure(provider: &str, err: impl std::fmt::Display) -> AppError {
    log::warn!("{} sign-in failed: {}", provider, err);
    AppError::Unauthorized(format!("{} authentication failed", provider))
}

pub struct HttpOAuthProvider {
    name: String,
    client: reqwest::Client,
    credentials: OAuthClientConfig,
    endpoints: ProviderEndpoints,
}

impl HttpOAuthProvider {
    pub fn new(name: &str, credentials: OAuthClientConfig, endpoints: ProviderEndpoints) -> Self {
        Self {
            name: name.to_string(),
            client: reqwest::Client::new(),
            credentials,
            endpoints,
        }
    }

    pub fn google(credentials: OAuthClientConfig) -> Self {
        Self::new("google", credentials, ProviderEndpoints::google())
    }

    pub fn microsoft(credentials: OAuthClientConfig) -> Self {
        Self::new("microsoft", credentials, ProviderEndpoints::microsoft())
    }
}

#[async_trait]
impl OAuthProvider for HttpOAuthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorize_url(&self) -> Result<String, AppError> {
        let scope = self.endpoints.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.endpoints.authorize,
            &[
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_url.as_str()),
                ("scope", scope.as_str()),
            ],
        )
        .map_err(|e| AppError::Configuration(format!("invalid authorize endpoint: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.credentials.redirect_url.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let token: TokenResponse = self
            .client
            .post(&self.endpoints.token)
            .form(&params)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| provider_failure(&self.name, e))?
            .json()
            .await
            .map_err(|e| provider_failure(&self.name, e))?;

        let info: UserInfo = self
            .client
            .get(&self.endpoints.userinfo)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| provider_failure(&self.name, e))?
            .json()
            .await
            .map_err(|e| provider_failure(&self.name, e))?;

        info.into_profile()
    }
}

/// The providers that are configured for this process.
#[derive(Clone, Default)]
pub struct OAuthProviders {
    pub google: Option<Arc<dyn OAuthProvider>>,
    pub microsoft: Option<Arc<dyn OAuthProvider>>,
}

impl OAuthProviders {
    pub fn get(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        match name {
            "google" => self.google.clone(),
            "microsoft" => self.microsoft.clone(),
            _ => None,
        }
    }
}
