/// HTTP handlers for engagement-service API
pub mod comments;
pub mod engagement;
pub mod notifications;
pub mod relationships;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

const DEFAULT_PAGE_LIMIT: i64 = 50;
const MAX_PAGE_LIMIT: i64 = 200;

/// Header carrying the authenticated user, set by the upstream gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(code: &'static str, error: impl Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            code: Some(code),
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        sanitize_limit(self.limit)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Clamp a requested page size into `1..=200`, defaulting to 50.
pub fn sanitize_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}

/// The calling user, if the request carries a valid `X-User-Id` header.
///
/// A missing or malformed header yields `Actor(None)`; the service decides
/// whether the operation needs an identity.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub Option<Uuid>);

impl Actor {
    pub fn id(&self) -> Option<Uuid> {
        self.0
    }
}

impl FromRequest for Actor {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let actor = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());
        ready(Ok(Actor(actor)))
    }
}

/// Register every `/api/v1` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(relationships::register_routes)
            .configure(engagement::register_routes)
            .configure(comments::register_routes)
            .configure(notifications::register_routes),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_sanitize_limit() {
        assert_eq!(sanitize_limit(None), 50);
        assert_eq!(sanitize_limit(Some(0)), 1);
        assert_eq!(sanitize_limit(Some(-5)), 1);
        assert_eq!(sanitize_limit(Some(20)), 20);
        assert_eq!(sanitize_limit(Some(10_000)), 200);
    }

    #[test]
    fn test_page_offset_never_negative() {
        let page = PageQuery {
            limit: None,
            offset: Some(-3),
        };
        assert_eq!(page.offset(), 0);
    }

    #[actix_rt::test]
    async fn test_actor_extraction() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();
        let actor = Actor::extract(&req).await.unwrap();
        assert_eq!(actor.id(), Some(id));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert_eq!(Actor::extract(&req).await.unwrap().id(), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(Actor::extract(&req).await.unwrap().id(), None);
    }

    #[test]
    fn test_error_envelope() {
        let body = serde_json::to_value(ApiResponse::<()>::err("not_found", "missing")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "not_found");
        assert_eq!(body["error"], "missing");
    }
}
