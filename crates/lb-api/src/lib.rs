//! # lb-api
//!
//! The web routing layer for the life block content engine.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;
use lb_core::error::AppError;

pub use error::ApiError;
pub use handlers::AppState;

/// Malformed bodies (bad JSON, unknown field types) answer with the same
/// error shape as everything else.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::warn!("rejected body for {} {}: {err}", req.method(), req.path());
        ApiError::from(AppError::ValidationError(err.to_string())).into()
    })
}

/// Configures the routes for life blocks and their contents.
///
/// # Developer Note
/// Routes are registered on a `ServiceConfig` so the binary can mount the
/// API under a prefix if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(handlers::index))
        .service(
            web::scope("/life_blocks")
                .route("", web::get().to(handlers::list_life_blocks))
                .route("", web::post().to(handlers::create_life_block))
                .route("/{id}", web::get().to(handlers::get_life_block))
                .route("/{id}", web::put().to(handlers::update_life_block))
                .route("/{id}", web::delete().to(handlers::delete_life_block))
                .route("/{id}/contents", web::post().to(handlers::add_content))
                .route("/{id}/contents/{content_id}", web::get().to(handlers::get_content))
                .route("/{id}/contents/{content_id}", web::put().to(handlers::update_content))
                .route("/{id}/contents/{content_id}", web::delete().to(handlers::remove_content)),
        );
}
