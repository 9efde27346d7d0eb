//! Bearer-token extractor. Handlers that take an `Owner` only run for
//! requests the configured `AuthProvider` accepts.

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use lb_core::error::AppError;

use crate::error::ApiError;
use crate::handlers::AppState;

/// The authenticated user id all life block access is scoped to.
#[derive(Debug, Clone)]
pub struct Owner(String);

impl Owner {
    pub fn id(&self) -> &str {
        &self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<Owner, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not registered".to_string()))?;

    let token = bearer_token(req).ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    let user_id = state.auth.verify_token(token)?;
    Ok(Owner(user_id))
}

impl FromRequest for Owner {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
