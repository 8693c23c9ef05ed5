// Database query helpers for SurrealDB.
//
// Each operation is individually atomic at the storage layer; nothing here
// assumes a cross-record transaction. The refresh-token update is a
// deliberate single-field write so it cannot disturb (or be blocked by)
// any other field on the record.

use crate::db::schema::*;
use anyhow::{Result, anyhow};
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

pub struct QueryBuilder;

impl QueryBuilder {
    /// Create a new user record in the database.
    ///
    /// The UNIQUE indexes on `username` and `email` are the last line of
    /// defense; callers are expected to pre-check for duplicates and
    /// surface a proper conflict before reaching this point.
    pub async fn create_user(db: &Surreal<Any>, data: &UserCreate) -> Result<UserRecord> {
        let mut res = db
            .query(
                r#"
                CREATE user SET
                    username = $username,
                    email = $email,
                    full_name = $full_name,
                    password_hash = $password_hash,
                    avatar_url = $avatar_url,
                    cover_image_url = $cover_image_url,
                    refresh_token = NONE
                "#,
            )
            .bind(("username", data.username.clone()))
            .bind(("email", data.email.clone()))
            .bind(("full_name", data.full_name.clone()))
            .bind(("password_hash", data.password_hash.clone()))
            .bind(("avatar_url", data.avatar_url.clone()))
            .bind(("cover_image_url", data.cover_image_url.clone()))
            .await?;

        let created: Option<UserRecord> = res.take(0)?;
        created.ok_or_else(|| anyhow!("failed to create user record"))
    }

    /// Find a user matching either alternate key.
    ///
    /// Username and email are interchangeable login identifiers; only one
    /// needs to match.
    pub async fn find_user_by_alternate_keys(
        db: &Surreal<Any>,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>> {
        let username = username.to_string();
        let email = email.to_string();

        let mut res = db
            .query(
                r#"
                SELECT * FROM user
                WHERE username = $username OR email = $email
                LIMIT 1
                "#,
            )
            .bind(("username", username))
            .bind(("email", email))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Find a user by database ID.
    pub async fn find_user_by_id(
        db: &Surreal<Any>,
        user_id: &RecordId,
    ) -> Result<Option<UserRecord>> {
        let mut res = db
            .query("SELECT * FROM user WHERE id = $id LIMIT 1")
            .bind(("id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Set or clear the stored refresh token for a user.
    ///
    /// This touches exactly one field and is last-writer-wins: two racing
    /// rotations both succeed at the storage layer, and whichever wrote
    /// last owns the currently-valid token.
    pub async fn update_refresh_token(
        db: &Surreal<Any>,
        user_id: &RecordId,
        token: Option<String>,
    ) -> Result<()> {
        db.query(
            r#"
            UPDATE user SET
                refresh_token = $refresh_token,
                updated_at = time::now()
            WHERE id = $id
            "#,
        )
        .bind(("id", user_id.clone()))
        .bind(("refresh_token", token))
        .await?
        .check()?;

        Ok(())
    }

    /// Replace the derived password secret for a user.
    pub async fn update_password(
        db: &Surreal<Any>,
        user_id: &RecordId,
        password_hash: String,
    ) -> Result<()> {
        db.query(
            r#"
            UPDATE user SET
                password_hash = $password_hash,
                updated_at = time::now()
            WHERE id = $id
            "#,
        )
        .bind(("id", user_id.clone()))
        .bind(("password_hash", password_hash))
        .await?
        .check()?;

        Ok(())
    }

    /// Update the profile fields (display name and email) for a user.
    pub async fn update_profile(
        db: &Surreal<Any>,
        user_id: &RecordId,
        full_name: String,
        email: String,
    ) -> Result<UserRecord> {
        let mut res = db
            .query(
                r#"
                UPDATE user SET
                    full_name = $full_name,
                    email = $email,
                    updated_at = time::now()
                WHERE id = $id
                "#,
            )
            .bind(("id", user_id.clone()))
            .bind(("full_name", full_name))
            .bind(("email", email))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("user not found for profile update"))
    }

    /// Update one media URL slot (avatar or cover image) for a user.
    pub async fn update_media_url(
        db: &Surreal<Any>,
        user_id: &RecordId,
        slot: MediaSlot,
        url: String,
    ) -> Result<UserRecord> {
        // Field name comes from a closed enum, not caller input
        let query = format!(
            "UPDATE user SET {} = $url, updated_at = time::now() WHERE id = $id",
            slot.field()
        );

        let mut res = db
            .query(query)
            .bind(("id", user_id.clone()))
            .bind(("url", url))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("user not found for media update"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};

    async fn setup_test_db() -> crate::db::Db {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    fn sample_user() -> UserCreate {
        UserCreate {
            username: "ada".to_string(),
            email: "ada@x.io".to_string(),
            full_name: "Ada Lovelace".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            avatar_url: Some("https://cdn.example/a.png".to_string()),
            cover_image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_alternate_keys() {
        let db = setup_test_db().await;
        let created = QueryBuilder::create_user(&db, &sample_user()).await.unwrap();
        assert_eq!(created.username, "ada");
        assert!(created.refresh_token.is_none());

        // Either key alone matches
        let by_username = QueryBuilder::find_user_by_alternate_keys(&db, "ada", "nope@x.io")
            .await
            .unwrap();
        assert!(by_username.is_some());

        let by_email = QueryBuilder::find_user_by_alternate_keys(&db, "nope", "ada@x.io")
            .await
            .unwrap();
        assert!(by_email.is_some());

        let neither = QueryBuilder::find_user_by_alternate_keys(&db, "nope", "nope@x.io")
            .await
            .unwrap();
        assert!(neither.is_none());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let db = setup_test_db().await;
        let created = QueryBuilder::create_user(&db, &sample_user()).await.unwrap();

        let found = QueryBuilder::find_user_by_id(&db, &created.id).await.unwrap();
        assert_eq!(found.unwrap().email, "ada@x.io");

        let missing = QueryBuilder::find_user_by_id(&db, &RecordId::from_table_key("user", "nope"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_set_and_clear() {
        let db = setup_test_db().await;
        let created = QueryBuilder::create_user(&db, &sample_user()).await.unwrap();

        QueryBuilder::update_refresh_token(&db, &created.id, Some("tok-1".to_string()))
            .await
            .unwrap();
        let user = QueryBuilder::find_user_by_id(&db, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("tok-1"));

        // Overwrite is the only form of invalidation
        QueryBuilder::update_refresh_token(&db, &created.id, Some("tok-2".to_string()))
            .await
            .unwrap();
        let user = QueryBuilder::find_user_by_id(&db, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("tok-2"));

        QueryBuilder::update_refresh_token(&db, &created.id, None)
            .await
            .unwrap();
        let user = QueryBuilder::find_user_by_id(&db, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert!(user.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_by_index() {
        let db = setup_test_db().await;
        QueryBuilder::create_user(&db, &sample_user()).await.unwrap();

        let mut dup = sample_user();
        dup.email = "other@x.io".to_string();
        let result = QueryBuilder::create_user(&db, &dup).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_and_media() {
        let db = setup_test_db().await;
        let created = QueryBuilder::create_user(&db, &sample_user()).await.unwrap();

        let updated = QueryBuilder::update_profile(
            &db,
            &created.id,
            "Ada King".to_string(),
            "ada@lovelace.io".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(updated.full_name, "Ada King");
        assert_eq!(updated.email, "ada@lovelace.io");

        let updated = QueryBuilder::update_media_url(
            &db,
            &created.id,
            MediaSlot::CoverImage,
            "https://cdn.example/c.png".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(
            updated.cover_image_url.as_deref(),
            Some("https://cdn.example/c.png")
        );
        // Untouched slot keeps its value
        assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example/a.png"));

        // The other slot routes to its own column
        let updated = QueryBuilder::update_media_url(
            &db,
            &created.id,
            MediaSlot::Avatar,
            "https://cdn.example/b.png".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example/b.png"));
        assert_eq!(
            updated.cover_image_url.as_deref(),
            Some("https://cdn.example/c.png")
        );
    }
}
