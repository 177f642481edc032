//! Campus Server
//!
//! The HTTP backend for the Campus Connect site.
//!
//! ## Features
//!
//! - **Public listings**: Events and student projects, served from a view cache
//! - **Admin area**: Cookie-gated CRUD for events, projects and taxonomies
//! - **Uploads**: Image upload forwarding to a Cloudinary-compatible host

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use campus::{session::hash_password, AdminCredentials, Config, HostCredentials};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use campus_server::{api, AppState};

/// Campus Server - events, student projects and image uploads
#[derive(Parser, Debug)]
#[command(name = "campus-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the SQLite document store
    #[arg(long, env = "CAMPUS_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Image host account name
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    cloudinary_cloud_name: Option<String>,

    /// Image host API key
    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true)]
    cloudinary_api_key: Option<String>,

    /// Image host API secret
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    cloudinary_api_secret: Option<String>,

    /// Admin username
    #[arg(long, env = "ADMIN_USERNAME")]
    admin_username: Option<String>,

    /// Admin password (plaintext)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Admin password as an argon2 PHC hash; takes precedence over the plaintext password
    #[arg(long, env = "ADMIN_PASSWORD_HASH", hide_env_values = true)]
    admin_password_hash: Option<String>,

    /// Print the argon2 hash of a password for ADMIN_PASSWORD_HASH and exit
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,

    /// HTTP port
    #[arg(long, default_value = "3000", env = "CAMPUS_PORT")]
    port: u16,

    /// Log level
    #[arg(long, default_value = "info", env = "CAMPUS_LOG_LEVEL")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Some(password) = &args.hash_password {
        println!("{}", hash_password(password).context("Failed to hash password")?);
        return Ok(());
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Campus Server");

    let port = args.port;
    let config = build_config(args)?;
    info!(path = %config.database_path.display(), "Database path");

    let state = Arc::new(AppState::open(&config).context("Failed to open application state")?);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let app = api::router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind HTTP server")?;

    // Run with graceful shutdown on ctrl-c
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Campus Server shutting down");
    Ok(())
}

/// Build the library configuration from the arguments
fn build_config(args: Args) -> Result<Config> {
    let database_path = args
        .database_path
        .unwrap_or_else(Config::default_database_path);
    let config = Config::new(database_path).with_image_host(HostCredentials::new(
        args.cloudinary_cloud_name.unwrap_or_default(),
        args.cloudinary_api_key.unwrap_or_default(),
        args.cloudinary_api_secret.unwrap_or_default(),
    ));

    let admin = match (args.admin_username, args.admin_password_hash, args.admin_password) {
        (Some(username), Some(hash), _) => {
            Some(AdminCredentials::hashed(username, hash).context("Invalid ADMIN_PASSWORD_HASH")?)
        }
        (Some(username), None, Some(password)) => {
            warn!("ADMIN_PASSWORD is plaintext, prefer ADMIN_PASSWORD_HASH");
            Some(AdminCredentials::plain(username, password))
        }
        _ => {
            warn!("Admin credentials not configured, every login will be refused");
            None
        }
    };

    Ok(match admin {
        Some(admin) => config.with_admin(admin),
        None => config,
    })
}

/// Wait for a ctrl-c signal for graceful shutdown
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c, initiating graceful shutdown");
}
