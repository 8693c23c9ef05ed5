// Core modules
mod account;
pub mod api;
mod auth;
mod config;
mod db;
mod error;
mod media;
mod password;
mod response;
mod session;
mod token;
mod types;

// Re-export key types and functions
pub use account::{AccountService, NewAccount};
pub use api::{AppState, create_router};
pub use auth::RequestIdentity;
pub use config::{MediaConfig, TokenConfig};
pub use db::{DatabaseConfig, ProfileUpdate, PublicUser, UserRecord, create_connection, ensure_schema};
pub use error::{ApiError, ApiResult};
pub use media::MediaStore;
pub use session::{SessionManager, SessionStart};
pub use token::{Claims, TokenCodec, TokenKind, TokenPair};
pub use types::{AccessToken, RefreshToken, Username};

use anyhow::Result;
use std::sync::Arc;

/// Convenience function to create a fully wired router.
///
/// Connects to the database, applies the schema, and builds the axum app
/// with the session manager, account service, and media store attached.
pub async fn create_app(
    db_config: DatabaseConfig,
    token_config: TokenConfig,
    media_config: MediaConfig,
) -> Result<axum::Router> {
    let db = create_connection(db_config).await?;
    ensure_schema(&db).await?;

    let codec = Arc::new(TokenCodec::new(token_config));
    let state = AppState {
        db: db.clone(),
        sessions: SessionManager::new(db.clone(), codec),
        accounts: AccountService::new(db.clone()),
        media: MediaStore::new(media_config)?,
    };

    Ok(create_router(state))
}
