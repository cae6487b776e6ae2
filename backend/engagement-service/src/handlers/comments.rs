/// Comment handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::engagement::content_ref;
use super::{Actor, ApiResponse};
use crate::error::ServiceResult;
use crate::services::EngagementService;

/// Request body for a new comment
#[derive(Debug, Deserialize)]
pub struct CreateCommentPayload {
    pub body: String,
    pub parent_comment_id: Option<Uuid>,
}

/// Comment on an outfit or post
///
/// POST /api/v1/content/{kind}/{id}/comments
pub async fn add_comment(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<(String, Uuid)>,
    payload: web::Json<CreateCommentPayload>,
) -> ServiceResult<HttpResponse> {
    let target = content_ref(path)?;
    let payload = payload.into_inner();
    let comment = service
        .add_comment(actor.id(), target, &payload.body, payload.parent_comment_id)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(comment)))
}

/// Threaded comments, oldest first
///
/// GET /api/v1/content/{kind}/{id}/comments
pub async fn list_comments(
    service: web::Data<Arc<EngagementService>>,
    path: web::Path<(String, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let target = content_ref(path)?;
    let threads = service.list_comments(target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(threads)))
}

/// POST /api/v1/comments/{id}/like
pub async fn toggle_comment_like(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let outcome = service
        .toggle_comment_like(actor.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome)))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/content/{kind}/{id}/comments")
            .route(web::post().to(add_comment))
            .route(web::get().to(list_comments)),
    )
    .route("/comments/{id}/like", web::post().to(toggle_comment_like));
}
