use crate::{
    auth::{AuthenticatedUser, OAuthProviders},
    error::AppError,
    models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UpdateUserRequest},
    services::AccountManager,
    uploads::{UploadStore, MAX_UPLOAD_BYTES},
};
use actix_multipart::{Field, Multipart};
use actix_web::{get, http::header, post, web, HttpResponse, Responder};
use futures::TryStreamExt;
use serde::Deserialize;
use validator::Validate;

/// Origin allowed to receive the OAuth popup's `postMessage`.
#[derive(Debug, Clone)]
pub struct FrontendOrigin(pub String);

/// Query string the provider appends to the redirect URL.
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub error: Option<String>,
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::BadRequest("Form field must not exceed 5 MB.".into()));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Register a new user
///
/// Expects `multipart/form-data` with a `data` field holding the JSON payload and an optional
/// `picture` file. Responds `201` with the created user.
#[post("/register")]
pub async fn register(
    accounts: web::Data<AccountManager>,
    uploads: web::Data<UploadStore>,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut data: Option<String> = None;
    let mut picture: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();
        match name.as_str() {
            "data" => {
                let raw = read_field(&mut field, MAX_UPLOAD_BYTES).await?;
                data = Some(
                    String::from_utf8(raw)
                        .map_err(|_| AppError::BadRequest("data must be UTF-8 JSON.".into()))?,
                );
            }
            "picture" => {
                let original = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or_default()
                    .to_string();
                let bytes = read_field(&mut field, MAX_UPLOAD_BYTES).await?;
                if !bytes.is_empty() {
                    picture = Some((original, bytes));
                }
            }
            _ => {
                read_field(&mut field, MAX_UPLOAD_BYTES).await?;
            }
        }
    }

    let raw = data.ok_or_else(|| AppError::BadRequest("Missing data field.".into()))?;
    let request: RegisterRequest = serde_json::from_str(&raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid data field: {}", e)))?;
    request.validate()?;

    let stored = match picture {
        Some((original, bytes)) => Some(uploads.save(&original, &bytes).await?),
        None => None,
    };

    match accounts.create(request, stored.clone()).await {
        Ok(user) => Ok(HttpResponse::Created().json(user)),
        Err(err) => {
            if let Some(upload) = stored {
                uploads.discard(&upload).await;
            }
            Err(err)
        }
    }
}

/// Login user
///
/// Verifies email and password and returns the user merged with a fresh token pair.
#[post("/login")]
pub async fn login(
    accounts: web::Data<AccountManager>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = accounts.login(login_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/refresh-token")]
pub async fn refresh_token(
    accounts: web::Data<AccountManager>,
    body: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    let response = accounts.refresh(&body.refresh_token).await?;
    Ok(HttpResponse::Created().json(response))
}

fn redirect_to_provider(providers: &OAuthProviders, name: &str) -> Result<HttpResponse, AppError> {
    let provider = providers
        .get(name)
        .ok_or_else(|| AppError::NotFound(format!("{} sign-in is not configured.", name)))?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, provider.authorize_url()?))
        .finish())
}

async fn complete_sign_in(
    accounts: &AccountManager,
    providers: &OAuthProviders,
    name: &str,
    callback: OAuthCallback,
) -> Result<AuthResponse, AppError> {
    let provider = providers
        .get(name)
        .ok_or_else(|| AppError::NotFound(format!("{} sign-in is not configured.", name)))?;

    if let Some(error) = callback.error {
        log::warn!("{} sign-in was declined: {}", name, error);
        return Err(AppError::Unauthorized(format!("{} authentication failed", name)));
    }
    let code = callback
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization code".into()))?;

    let profile = provider.exchange_code(&code).await?;
    let user = accounts.find_or_provision(profile).await?;
    accounts.generate_tokens(Some(user))
}

/// Page shown in the sign-in popup: hands the payload to the opener window and closes.
pub fn popup_page(payload: &AuthResponse, origin: &str) -> Result<String, AppError> {
    let to_script = |value: &str| -> Result<String, AppError> {
        serde_json::to_string(value)
            .map(|json| json.replace("</", "<\\/"))
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    };
    let json = serde_json::to_string(payload)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .replace("</", "<\\/");

    Ok(format!(
        "<html><head><title>Login</title></head><body></body><script>\
         var res = {}; window.opener.postMessage(res, {}); window.close();\
         </script></html>",
        json,
        to_script(origin)?
    ))
}

#[get("/google")]
pub async fn google_login(providers: web::Data<OAuthProviders>) -> Result<HttpResponse, AppError> {
    redirect_to_provider(&providers, "google")
}

#[get("/google/redirect")]
pub async fn google_redirect(
    accounts: web::Data<AccountManager>,
    providers: web::Data<OAuthProviders>,
    origin: web::Data<FrontendOrigin>,
    query: web::Query<OAuthCallback>,
) -> Result<HttpResponse, AppError> {
    let response = complete_sign_in(&accounts, &providers, "google", query.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(popup_page(&response, &origin.0)?))
}

#[get("/microsoft")]
pub async fn microsoft_login(
    providers: web::Data<OAuthProviders>,
) -> Result<HttpResponse, AppError> {
    redirect_to_provider(&providers, "microsoft")
}

#[get("/microsoft/redirect")]
pub async fn microsoft_redirect(
    accounts: web::Data<AccountManager>,
    providers: web::Data<OAuthProviders>,
    query: web::Query<OAuthCallback>,
) -> Result<HttpResponse, AppError> {
    let response = complete_sign_in(&accounts, &providers, "microsoft", query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Requires a bearer token; registered behind `AuthMiddleware`.
pub async fn get_user(
    _caller: AuthenticatedUser,
    accounts: web::Data<AccountManager>,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user = accounts.find_one(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update_user(
    _caller: AuthenticatedUser,
    accounts: web::Data<AccountManager>,
    id: web::Path<i32>,
    patch: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let user = accounts.update(id.into_inner(), patch.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn deactivate_user(
    _caller: AuthenticatedUser,
    accounts: web::Data<AccountManager>,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user = accounts.deactivate(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}
