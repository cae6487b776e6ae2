/// Like and save handlers
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{Actor, ApiResponse};
use crate::domain::models::{ContentKind, ContentRef};
use crate::error::ServiceResult;
use crate::services::EngagementService;

#[derive(Debug, Serialize)]
struct LikeStatus {
    liked: bool,
}

#[derive(Debug, Serialize)]
struct SaveStatus {
    saved: bool,
}

/// Resolve `/content/{kind}/{id}` into a content reference.
pub(crate) fn content_ref(path: web::Path<(String, Uuid)>) -> ServiceResult<ContentRef> {
    let (kind, id) = path.into_inner();
    let kind: ContentKind = kind.parse()?;
    Ok(ContentRef { id, kind })
}

/// Toggle a like on an outfit or post
///
/// POST /api/v1/content/{kind}/{id}/like
pub async fn toggle_like(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<(String, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let target = content_ref(path)?;
    let outcome = service.toggle_like(actor.id(), target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome)))
}

/// GET /api/v1/content/{kind}/{id}/like
pub async fn like_status(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<(String, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let target = content_ref(path)?;
    let liked = service.is_liked(actor.id(), target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeStatus { liked })))
}

/// Toggle a save on an outfit
///
/// POST /api/v1/content/outfit/{id}/save
pub async fn toggle_save(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let outcome = service.toggle_save(actor.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome)))
}

/// GET /api/v1/content/outfit/{id}/save
pub async fn save_status(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let saved = service.is_saved(actor.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(SaveStatus { saved })))
}

/// GET /api/v1/content/{kind}/{id}/counts
pub async fn content_counts(
    service: web::Data<Arc<EngagementService>>,
    path: web::Path<(String, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let target = content_ref(path)?;
    let counts = service.content_counts(target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(counts)))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/content/outfit/{id}/save")
            .route(web::post().to(toggle_save))
            .route(web::get().to(save_status)),
    )
    .service(
        web::resource("/content/{kind}/{id}/like")
            .route(web::post().to(toggle_like))
            .route(web::get().to(like_status)),
    )
    .route("/content/{kind}/{id}/counts", web::get().to(content_counts));
}
