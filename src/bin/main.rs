use anyhow::Result;
use clap::{Parser, Subcommand};
use identity_gate::{DatabaseConfig, MediaConfig, TokenConfig, create_app};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "identity-gate")]
#[command(about = "User identity and session credential service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address, e.g. 0.0.0.0:4100
        #[arg(long, default_value = "0.0.0.0:4100")]
        bind: String,
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        db_url: String,
        /// Upload endpoint of the external media store
        #[arg(long, env = "MEDIA_UPLOAD_URL")]
        media_url: Option<String>,
    },
    /// Initialize the database schema and exit
    Init {
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("identity_gate=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db_url,
            media_url,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            let media_config = match media_url {
                Some(upload_url) => MediaConfig { upload_url },
                None => MediaConfig::default(),
            };

            let app = create_app(db_config, TokenConfig::from_env(), media_config).await?;

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Identity service listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            let db = identity_gate::create_connection(db_config).await?;
            identity_gate::ensure_schema(&db).await?;
            info!("Database schema initialized");
        }
    }

    Ok(())
}
