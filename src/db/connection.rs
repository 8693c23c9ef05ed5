use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "identity".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "gate".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    // Use the specified namespace and database
    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = vec![
        // User table: the identity record is the sole durable anchor for
        // session state. `refresh_token` holds at most one value at a time.
        "DEFINE TABLE user SCHEMAFULL;
         DEFINE FIELD username ON TABLE user TYPE string;
         DEFINE FIELD email ON TABLE user TYPE string;
         DEFINE FIELD full_name ON TABLE user TYPE string;
         DEFINE FIELD password_hash ON TABLE user TYPE string;
         DEFINE FIELD avatar_url ON TABLE user TYPE option<string>;
         DEFINE FIELD cover_image_url ON TABLE user TYPE option<string>;
         DEFINE FIELD refresh_token ON TABLE user TYPE option<string>;
         DEFINE FIELD created_at ON TABLE user VALUE time::now();
         DEFINE FIELD updated_at ON TABLE user VALUE time::now();",
        // Uniqueness for both login identifiers
        "DEFINE INDEX user_username ON TABLE user COLUMNS username UNIQUE;
         DEFINE INDEX user_email ON TABLE user COLUMNS email UNIQUE;",
    ];

    for query in schema_queries {
        db.query(query).await?;
    }

    Ok(())
}
