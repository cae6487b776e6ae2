/// Follow graph handlers
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{Actor, ApiResponse, PageQuery};
use crate::error::ServiceResult;
use crate::services::EngagementService;

#[derive(Debug, Serialize)]
struct FollowStatus {
    following: bool,
}

/// Follow a user
///
/// POST /api/v1/users/{id}/follow
pub async fn follow(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let outcome = service.follow(actor.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome)))
}

/// Unfollow a user
///
/// DELETE /api/v1/users/{id}/follow
pub async fn unfollow(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let outcome = service.unfollow(actor.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome)))
}

/// GET /api/v1/users/{id}/follow
pub async fn follow_status(
    service: web::Data<Arc<EngagementService>>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let following = service.is_following(actor.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FollowStatus { following })))
}

/// GET /api/v1/users/{id}/followers
pub async fn list_followers(
    service: web::Data<Arc<EngagementService>>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> ServiceResult<HttpResponse> {
    let entries = service
        .list_followers(path.into_inner(), query.limit(), query.offset())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entries)))
}

/// GET /api/v1/users/{id}/following
pub async fn list_following(
    service: web::Data<Arc<EngagementService>>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> ServiceResult<HttpResponse> {
    let entries = service
        .list_following(path.into_inner(), query.limit(), query.offset())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entries)))
}

/// GET /api/v1/users/{id}/counts
pub async fn follow_counts(
    service: web::Data<Arc<EngagementService>>,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let counts = service.follow_counts(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(counts)))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users/{id}")
            .service(
                web::resource("/follow")
                    .route(web::post().to(follow))
                    .route(web::delete().to(unfollow))
                    .route(web::get().to(follow_status)),
            )
            .route("/followers", web::get().to(list_followers))
            .route("/following", web::get().to(list_following))
            .route("/counts", web::get().to(follow_counts)),
    );
}
