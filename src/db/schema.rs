use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, sql::Datetime};

/// Persisted representation of a user identity in SurrealDB.
///
/// This is the sole durable anchor for session state: `refresh_token` holds
/// the one refresh token currently considered valid for this user, or none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable database identifier for this user (table: `user`).
    pub id: RecordId,
    /// Unique username, stored lowercase.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name shown to other users.
    pub full_name: String,
    /// One-way derived form of the password (argon2 PHC string).
    pub password_hash: String,
    /// URL of the uploaded avatar image, if any.
    pub avatar_url: Option<String>,
    /// URL of the uploaded cover image, if any.
    pub cover_image_url: Option<String>,
    /// The single currently-valid refresh token, if a session is active.
    pub refresh_token: Option<String>,
    /// When this record was first created.
    pub created_at: Option<Datetime>,
    /// When this record was last updated.
    pub updated_at: Option<Datetime>,
}

/// Payload used when inserting a new user into the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    /// Unique username, already lowercased by validation.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// One-way derived form of the password.
    pub password_hash: String,
    /// URL of the uploaded avatar image.
    pub avatar_url: Option<String>,
    /// URL of the uploaded cover image.
    pub cover_image_url: Option<String>,
}

/// Partial update payload for profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name, if changing.
    pub full_name: Option<String>,
    /// New email address, if changing.
    pub email: Option<String>,
}

/// Which media slot on the user record an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    Avatar,
    CoverImage,
}

impl MediaSlot {
    /// Field name on the `user` table for this slot.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar_url",
            Self::CoverImage => "cover_image_url",
        }
    }
}

/// Projection of a user safe to return to callers.
///
/// Excludes the password hash and the refresh token at the type level, so a
/// handler cannot accidentally serialize either secret field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: Option<Datetime>,
}

impl From<UserRecord> for PublicUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            created_at: user.created_at,
        }
    }
}
