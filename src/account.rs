//! Account registration and profile CRUD.
//!
//! Everything here is straight-line: validate, check for conflicts, write,
//! return the stripped projection. Session state never changes through this
//! module.

use surrealdb::RecordId;
use tracing::info;

use crate::db::{Db, MediaSlot, ProfileUpdate, PublicUser, QueryBuilder, UserCreate};
use crate::error::{ApiError, ApiResult};
use crate::password::{hash_password, validate_password};
use crate::types::Username;

/// Input for registering a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    /// Already uploaded to the media store by the transport layer.
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Validate and normalize a username (lowercase).
pub fn validate_username(raw: &str) -> ApiResult<Username> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::Validation(
            "username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(Username::new(trimmed.to_lowercase()))
}

/// Minimal email shape check.
pub fn validate_email(raw: &str) -> ApiResult<String> {
    let trimmed = raw.trim();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// User account operations over the credential store.
#[derive(Clone)]
pub struct AccountService {
    db: Db,
}

impl AccountService {
    /// Create a new account service.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Validate a registration's text fields and check both unique keys,
    /// without writing anything.
    ///
    /// Exposed separately so the transport layer can reject bad input and
    /// duplicates before paying for media uploads.
    pub async fn ensure_registrable(&self, account: &NewAccount) -> ApiResult<()> {
        if account.full_name.trim().is_empty() {
            return Err(ApiError::Validation("full name is required".to_string()));
        }
        let username = validate_username(&account.username)?;
        let email = validate_email(&account.email)?;
        validate_password(&account.password)?;

        let existing =
            QueryBuilder::find_user_by_alternate_keys(&self.db, username.as_str(), &email).await?;
        if existing.is_some() {
            return Err(ApiError::Conflict(
                "username or email already registered".to_string(),
            ));
        }

        Ok(())
    }

    /// Register a new user.
    ///
    /// All text fields are required; username and email must be globally
    /// unique. The password is hashed before anything is persisted.
    pub async fn register(&self, account: NewAccount) -> ApiResult<PublicUser> {
        self.ensure_registrable(&account).await?;
        let username = validate_username(&account.username)?;
        let email = validate_email(&account.email)?;

        let create = UserCreate {
            username: username.into_inner(),
            email,
            full_name: account.full_name.trim().to_string(),
            password_hash: hash_password(&account.password)?,
            avatar_url: account.avatar_url,
            cover_image_url: account.cover_image_url,
        };

        let user = QueryBuilder::create_user(&self.db, &create).await?;
        info!(username = %user.username, "registered new user");

        Ok(user.into())
    }

    /// Read a user by id.
    pub async fn user_by_id(&self, user_id: &RecordId) -> ApiResult<PublicUser> {
        let user = QueryBuilder::find_user_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("user does not exist".to_string()))?;
        Ok(user.into())
    }

    /// Update display name and/or email. Fields left out keep their value.
    pub async fn update_profile(
        &self,
        user_id: &RecordId,
        update: ProfileUpdate,
    ) -> ApiResult<PublicUser> {
        if update.full_name.is_none() && update.email.is_none() {
            return Err(ApiError::Validation(
                "nothing to update: provide full_name or email".to_string(),
            ));
        }

        let current = QueryBuilder::find_user_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("user does not exist".to_string()))?;

        let full_name = match update.full_name {
            Some(name) if name.trim().is_empty() => {
                return Err(ApiError::Validation("full name cannot be empty".to_string()));
            }
            Some(name) => name.trim().to_string(),
            None => current.full_name,
        };
        let email = match update.email {
            Some(email) => {
                let email = validate_email(&email)?;
                // Changing email must not collide with another account
                if let Some(other) =
                    QueryBuilder::find_user_by_alternate_keys(&self.db, "", &email).await?
                    && other.id != *user_id
                {
                    return Err(ApiError::Conflict("email already registered".to_string()));
                }
                email
            }
            None => current.email,
        };

        let user = QueryBuilder::update_profile(&self.db, user_id, full_name, email).await?;
        Ok(user.into())
    }

    /// Point one media slot (avatar or cover image) at an uploaded URL.
    pub async fn set_media_url(
        &self,
        user_id: &RecordId,
        slot: MediaSlot,
        url: String,
    ) -> ApiResult<PublicUser> {
        // Verify existence first so a bad id is NotFound, not a silent no-op
        QueryBuilder::find_user_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("user does not exist".to_string()))?;

        let user = QueryBuilder::update_media_url(&self.db, user_id, slot, url).await?;
        Ok(user.into())
    }
}
