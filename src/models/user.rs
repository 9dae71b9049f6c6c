use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Locale assigned to new accounts.
pub const DEFAULT_LANG: &str = "en";

/// A user account as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Bcrypt hash. `None` for accounts provisioned through an OAuth provider.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub picture: Option<String>,
    pub is_active: bool,
    pub lang: String,
    pub is_dark_mode: bool,
    pub is_promotional_emails: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the store needs to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub picture: Option<String>,
    pub is_active: bool,
    pub lang: String,
    pub is_dark_mode: bool,
    pub is_promotional_emails: bool,
}

/// Column changes applied by the store; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub picture: Option<String>,
    pub is_active: Option<bool>,
    pub lang: Option<String>,
    pub is_dark_mode: Option<bool>,
    pub is_promotional_emails: Option<bool>,
}

/// JSON payload carried in the `data` field of the registration form.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password must not be empty."))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters."))]
    pub full_name: String,
    /// Picture URL. Ignored when a picture file is uploaded with the form.
    pub picture: Option<String>,
    #[serde(default)]
    pub is_promotional_emails: bool,
}

/// Represents the payload for a user login request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password must not be empty."))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Profile update. The password pair only takes effect when both halves are present.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "Email must be a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters."))]
    pub full_name: Option<String>,
    pub picture: Option<String>,
    #[validate(length(min = 2, max = 10, message = "Language must be 2 to 10 characters."))]
    pub lang: Option<String>,
    pub is_dark_mode: Option<bool>,
    pub is_promotional_emails: Option<bool>,
    pub current_password: Option<String>,
    #[validate(length(min = 1, message = "New password must not be empty."))]
    pub new_password: Option<String>,
}

/// Token pair merged with the user's public fields.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}
