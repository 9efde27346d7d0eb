//! # lb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the content engine.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use futures_util::TryStreamExt;
use lb_core::error::AppError;
use lb_core::models::{ContentUpdate, LifeBlock, LifeBlockPatch, NewContent, NewLifeBlock};
use lb_core::traits::{AuthProvider, LifeBlockRepo};
use lb_core::{ContentStore, MutationGateway};
use serde_json::json;
use uuid::Uuid;

use crate::auth::Owner;
use crate::error::ApiError;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub store: ContentStore,
    pub gateway: MutationGateway,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(repo: Arc<dyn LifeBlockRepo>, auth: Arc<dyn AuthProvider>, strict_validation: bool) -> Self {
        Self {
            store: ContentStore::new(repo.clone()),
            gateway: MutationGateway::new(repo).with_strict_validation(strict_validation),
            auth,
        }
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

/// Ids that cannot be parsed cannot exist either.
fn parse_life_block_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::life_block_not_found(raw))
}

/// Liveness probe for "/".
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Life blocks server is running!")
}

pub async fn list_life_blocks(data: web::Data<AppState>, owner: Owner) -> ApiResult {
    let blocks: Vec<LifeBlock> = data.store.list(owner.id()).try_collect().await?;
    Ok(HttpResponse::Ok().json(blocks))
}

pub async fn create_life_block(
    data: web::Data<AppState>,
    owner: Owner,
    payload: web::Json<NewLifeBlock>,
) -> ApiResult {
    let block = data
        .gateway
        .create_life_block(owner.id(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(block))
}

pub async fn get_life_block(data: web::Data<AppState>, owner: Owner, path: web::Path<String>) -> ApiResult {
    let id = parse_life_block_id(&path)?;
    let block = data.store.get(id, owner.id()).await?;
    Ok(HttpResponse::Ok().json(block))
}

pub async fn update_life_block(
    data: web::Data<AppState>,
    owner: Owner,
    path: web::Path<String>,
    patch: web::Json<LifeBlockPatch>,
) -> ApiResult {
    let id = parse_life_block_id(&path)?;
    let block = data
        .gateway
        .update_life_block(id, owner.id(), patch.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(block))
}

pub async fn delete_life_block(data: web::Data<AppState>, owner: Owner, path: web::Path<String>) -> ApiResult {
    let id = parse_life_block_id(&path)?;
    data.gateway.delete_life_block(id, owner.id()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Life block deleted successfully",
        "deleted": true,
    })))
}

pub async fn add_content(
    data: web::Data<AppState>,
    owner: Owner,
    path: web::Path<String>,
    payload: web::Json<NewContent>,
) -> ApiResult {
    let id = parse_life_block_id(&path)?;
    let block = data
        .gateway
        .add_content(id, owner.id(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(block))
}

pub async fn get_content(
    data: web::Data<AppState>,
    owner: Owner,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (raw_id, content_id) = path.into_inner();
    let id = parse_life_block_id(&raw_id)?;
    let content = data.store.get_content(id, owner.id(), &content_id).await?;
    Ok(HttpResponse::Ok().json(content))
}

pub async fn update_content(
    data: web::Data<AppState>,
    owner: Owner,
    path: web::Path<(String, String)>,
    payload: web::Json<ContentUpdate>,
) -> ApiResult {
    let (raw_id, content_id) = path.into_inner();
    let id = parse_life_block_id(&raw_id)?;
    let block = data
        .gateway
        .update_content(id, owner.id(), &content_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(block))
}

pub async fn remove_content(
    data: web::Data<AppState>,
    owner: Owner,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (raw_id, content_id) = path.into_inner();
    let id = parse_life_block_id(&raw_id)?;
    let block = data
        .gateway
        .remove_content(id, owner.id(), &content_id)
        .await?;
    Ok(HttpResponse::Ok().json(block))
}
