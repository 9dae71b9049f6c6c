use std::sync::Arc;
use validator::Validate;

use crate::auth::{Claims, OAuthProfile, PasswordHasher, TokenService};
use crate::error::AppError;
use crate::models::{
    AuthResponse, LoginRequest, NewUser, RegisterRequest, UpdateUserRequest, User, UserChanges,
    DEFAULT_LANG,
};
use crate::store::{StoreError, UserStore};
use crate::uploads::{StoredUpload, UploadStore};

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// User lifecycle and token issuance.
#[derive(Clone)]
pub struct AccountManager {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    uploads: Arc<UploadStore>,
}

fn ensure_active(user: User) -> Result<User, AppError> {
    if user.is_active {
        Ok(user)
    } else {
        Err(AppError::BadRequest("User is not active.".into()))
    }
}

impl AccountManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
        uploads: Arc<UploadStore>,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            uploads,
        }
    }

    /// Registers a password account. An uploaded picture takes precedence over a picture URL
    /// in the payload.
    pub async fn create(
        &self,
        request: RegisterRequest,
        upload: Option<StoredUpload>,
    ) -> Result<User, AppError> {
        request.validate()?;

        let picture = match upload {
            Some(upload) => Some(self.uploads.public_url(&upload)),
            None => request.picture.filter(|url| !url.trim().is_empty()),
        };
        let password_hash = self.hasher.hash(&request.password)?;

        let new_user = NewUser {
            email: request.email,
            password_hash: Some(password_hash),
            full_name: request.full_name,
            picture,
            is_active: true,
            lang: DEFAULT_LANG.to_string(),
            is_dark_mode: false,
            is_promotional_emails: request.is_promotional_emails,
        };

        match self.users.insert(new_user).await {
            Ok(user) => {
                log::info!("registered user {}", user.id);
                Ok(user)
            }
            Err(StoreError::UniqueViolation { fields }) => Err(AppError::Conflict(format!(
                "A user with this {} already exists",
                fields.join(", ")
            ))),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn find_one(&self, id: i32) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", id)))?;
        ensure_active(user)
    }

    pub async fn find_active_by_email(&self, email: &str) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email {} not found.", email)))?;
        ensure_active(user)
    }

    /// Returns the account for a provider profile, creating a password-less one on first
    /// sign-in.
    pub async fn find_or_provision(&self, profile: OAuthProfile) -> Result<User, AppError> {
        if let Some(user) = self.users.find_by_email(&profile.email).await? {
            return ensure_active(user);
        }

        let new_user = NewUser {
            email: profile.email.clone(),
            password_hash: None,
            full_name: profile.full_name,
            picture: profile.picture,
            is_active: true,
            lang: DEFAULT_LANG.to_string(),
            is_dark_mode: false,
            is_promotional_emails: false,
        };

        match self.users.insert(new_user).await {
            Ok(user) => {
                log::info!("provisioned user {} from external sign-in", user.id);
                Ok(user)
            }
            // Lost a race against a concurrent first sign-in for the same email.
            Err(StoreError::UniqueViolation { .. }) => {
                self.find_active_by_email(&profile.email).await
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let user = match self.users.find_by_email(&request.email).await? {
            Some(user) if user.is_active => user,
            _ => {
                log::warn!("login rejected for unknown or inactive account");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
        };

        let matches = match &user.password_hash {
            Some(hash) => self.hasher.verify(&request.password, hash)?,
            None => false,
        };
        if !matches {
            log::warn!("login rejected for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        self.generate_tokens(Some(user))
    }

    /// Applies a profile patch. The password only changes when both `currentPassword` and
    /// `newPassword` are given and the current one matches.
    pub async fn update(&self, id: i32, patch: UpdateUserRequest) -> Result<User, AppError> {
        patch.validate()?;
        let user = self.find_one(id).await?;

        let password_hash = match (&patch.current_password, &patch.new_password) {
            (Some(current), Some(new)) => {
                let matches = match &user.password_hash {
                    Some(hash) => self.hasher.verify(current, hash)?,
                    None => false,
                };
                if !matches {
                    log::warn!("password change rejected for user {}", id);
                    return Err(AppError::Unauthorized("Invalid current password.".into()));
                }
                Some(self.hasher.hash(new)?)
            }
            _ => None,
        };

        let changes = UserChanges {
            email: patch.email,
            password_hash,
            full_name: patch.full_name,
            picture: patch.picture,
            is_active: None,
            lang: patch.lang,
            is_dark_mode: patch.is_dark_mode,
            is_promotional_emails: patch.is_promotional_emails,
        };
        let updated = self.users.update(id, changes).await?;
        log::info!("updated user {}", id);
        Ok(updated)
    }

    /// Soft delete.
    pub async fn deactivate(&self, id: i32) -> Result<User, AppError> {
        self.find_one(id).await?;
        let changes = UserChanges {
            is_active: Some(false),
            ..Default::default()
        };
        let user = self.users.update(id, changes).await?;
        log::info!("deactivated user {}", id);
        Ok(user)
    }

    pub fn generate_tokens(&self, user: Option<User>) -> Result<AuthResponse, AppError> {
        let user = user.ok_or_else(|| AppError::Unauthorized("User not found.".into()))?;
        let pair = self.tokens.issue_pair(user.id, &user.email)?;
        Ok(AuthResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        self.tokens.verify_refresh(token)
    }

    /// Mints a new pair from a refresh token. The account must still exist and be active.
    pub async fn refresh(&self, token: &str) -> Result<AuthResponse, AppError> {
        let claims = self.verify_refresh_token(token)?;
        let user = self.find_one(claims.sub).await?;
        self.generate_tokens(Some(user))
    }
}
