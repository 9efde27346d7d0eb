//! # Lifeblocks Binary
//!
//! The entry point that assembles the application based on compile-time features.
//!
//! `lifeblocks` serves the API; `lifeblocks token <user-id>` prints a bearer
//! token signed with the configured secret, for local development.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use lb_api::{configure_routes, middleware, AppState};
use lb_config::Settings;
use lb_core::traits::{AuthProvider, LifeBlockRepo};
use secrecy::ExposeSecret;

// Feature-gated imports: plugins are compiled to order
#[cfg(feature = "db-sqlite")]
use lb_db_sqlite::SqliteLifeBlockRepo;

#[cfg(feature = "auth-jwt")]
use lb_auth_jwt::JwtAuthProvider;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("lifeblocks needs a storage plugin: enable the `db-sqlite` feature");

#[cfg(not(feature = "auth-jwt"))]
compile_error!("lifeblocks needs an auth plugin: enable the `auth-jwt` feature");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG, so it goes in before the logger starts.
    let dotenv = lb_config::load_dotenv();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    if let Some(path) = dotenv {
        log::debug!("loaded environment from {}", path.display());
    }
    let settings = Settings::load()?;

    // 1. Initialize Auth Implementation
    #[cfg(feature = "auth-jwt")]
    let auth = Arc::new(JwtAuthProvider::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.token_ttl_secs,
    ));

    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        return match (command.as_str(), args.next()) {
            ("token", Some(user_id)) => {
                println!("{}", auth.issue_token(&user_id)?);
                Ok(())
            }
            _ => anyhow::bail!("usage: lifeblocks [token <user-id>]"),
        };
    }

    // 2. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let sqlite = Arc::new(SqliteLifeBlockRepo::new(&settings.database.url).await?);

    // 3. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let repo: Arc<dyn LifeBlockRepo> = sqlite.clone();
    let auth: Arc<dyn AuthProvider> = auth;
    let state = web::Data::new(AppState::new(repo, auth, settings.content.strict_validation));

    let (host, port) = settings.bind_address();
    let allowed_origin = settings.cors.allowed_origin.clone();
    if settings.content.strict_validation {
        log::info!("strict content validation enabled");
    }
    log::info!("🚀 Lifeblocks starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::standard_middleware())
            .wrap(middleware::cors_policy(allowed_origin.as_deref()))
            .wrap(middleware::security_headers())
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await?;

    // 4. Explicit shutdown of the persistence handle
    #[cfg(feature = "db-sqlite")]
    sqlite.close().await;
    log::info!("Lifeblocks stopped");

    Ok(())
}
