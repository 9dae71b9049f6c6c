use actix_cors::Cors;
use actix_web::http::header;
use std::sync::Arc;

use crate::auth::{HttpOAuthProvider, OAuthProvider, OAuthProviders, PasswordHasher, TokenService};
use crate::config::Config;
use crate::services::{AccountManager, TaskManager};
use crate::store::{TaskStore, UserStore};
use crate::uploads::UploadStore;

/// Everything the HTTP layer shares between workers. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountManager,
    pub tasks: TaskManager,
    pub tokens: Arc<TokenService>,
    pub uploads: Arc<UploadStore>,
    pub oauth: OAuthProviders,
    pub frontend_origin: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        oauth: OAuthProviders,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt));
        let uploads = Arc::new(UploadStore::new(
            config.uploads_dir.clone(),
            &config.backend_domain,
        ));
        let accounts = AccountManager::new(
            users,
            tokens.clone(),
            PasswordHasher::new(config.bcrypt_cost),
            uploads.clone(),
        );

        Self {
            accounts,
            tasks: TaskManager::new(tasks),
            tokens,
            uploads,
            oauth,
            frontend_origin: config.frontend_domain.clone(),
        }
    }
}

/// HTTP providers for every client registration present in the configuration.
pub fn oauth_providers(config: &Config) -> OAuthProviders {
    let build = |name: &str, provider: Option<HttpOAuthProvider>| {
        match &provider {
            Some(_) => log::info!("{} sign-in enabled", name),
            None => log::info!("{} sign-in disabled (no client credentials)", name),
        }
        provider.map(|p| Arc::new(p) as Arc<dyn OAuthProvider>)
    };

    OAuthProviders {
        google: build(
            "google",
            config.google.clone().map(HttpOAuthProvider::google),
        ),
        microsoft: build(
            "microsoft",
            config.microsoft.clone().map(HttpOAuthProvider::microsoft),
        ),
    }
}

/// CORS policy admitting only the frontend origin.
pub fn cors(frontend_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(frontend_origin)
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600)
}
