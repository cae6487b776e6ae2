/// Notification inbox handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{sanitize_limit, Actor, ApiResponse};
use crate::error::ServiceResult;
use crate::services::EngagementService;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
struct UnreadCount {
    unread: i64,
}

#[derive(Debug, Serialize)]
struct MarkedRead {
    updated: u64,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    query: web::Query<NotificationQuery>,
) -> ServiceResult<HttpResponse> {
    let notifications = service
        .list_notifications(
            actor.id(),
            sanitize_limit(query.limit),
            query.offset.unwrap_or(0).max(0),
            query.unread_only,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(notifications)))
}

/// GET /api/v1/notifications/unread_count
pub async fn unread_count(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
) -> ServiceResult<HttpResponse> {
    let unread = service.unread_notification_count(actor.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(UnreadCount { unread })))
}

/// Mark notification as read
///
/// PUT /api/v1/notifications/{id}/read
pub async fn mark_as_read(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    service
        .mark_notification_read(actor.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(MarkedRead { updated: 1 })))
}

/// PUT /api/v1/notifications/read_all
pub async fn mark_all_as_read(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
) -> ServiceResult<HttpResponse> {
    let updated = service.mark_all_notifications_read(actor.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(MarkedRead { updated })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/unread_count", web::get().to(unread_count))
            .route("/read_all", web::put().to(mark_all_as_read))
            .route("/{id}/read", web::put().to(mark_as_read)),
    );
}
