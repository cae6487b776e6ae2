//! Prometheus metrics for engagement-service.
//!
//! Collectors live in one `ServiceMetrics` set registered with the default
//! registry on first use. `/metrics` renders that registry.

use std::rc::Rc;
use std::time::{Duration, Instant};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "engagement_service";
const UNMATCHED_ROUTE: &str = "unmatched";
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

struct ServiceMetrics {
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
    operations: IntCounterVec,
    fanout: IntCounterVec,
}

impl ServiceMetrics {
    fn register(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            http_requests: attach(
                registry,
                IntCounterVec::new(
                    Opts::new("http_requests_total", "HTTP requests by route and status")
                        .namespace(NAMESPACE),
                    &["method", "route", "status"],
                )?,
            )?,
            http_latency: attach(
                registry,
                HistogramVec::new(
                    HistogramOpts::new("http_request_duration_seconds", "HTTP latency by route")
                        .namespace(NAMESPACE)
                        .buckets(LATENCY_BUCKETS.to_vec()),
                    &["method", "route", "status"],
                )?,
            )?,
            operations: attach(
                registry,
                IntCounterVec::new(
                    Opts::new("operations_total", "Engagement mutations by operation and outcome")
                        .namespace(NAMESPACE),
                    &["operation", "outcome"],
                )?,
            )?,
            fanout: attach(
                registry,
                IntCounterVec::new(
                    Opts::new(
                        "notification_fanout_total",
                        "Notification fan-out attempts by kind and outcome",
                    )
                    .namespace(NAMESPACE),
                    &["kind", "outcome"],
                )?,
            )?,
        })
    }
}

fn attach<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> prometheus::Result<C> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

static METRICS: Lazy<ServiceMetrics> = Lazy::new(|| {
    ServiceMetrics::register(prometheus::default_registry())
        .expect("engagement_service metrics registered twice")
});

/// Label set of one finished HTTP request
struct RequestLabels {
    method: Method,
    route: String,
    status: u16,
}

impl RequestLabels {
    fn observe(&self, elapsed: Duration) {
        let status = self.status.to_string();
        let values = [self.method.as_str(), self.route.as_str(), status.as_str()];
        METRICS.http_requests.with_label_values(&values).inc();
        METRICS
            .http_latency
            .with_label_values(&values)
            .observe(elapsed.as_secs_f64());
    }
}

pub fn record_operation(operation: &str, outcome: &str) {
    METRICS
        .operations
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_fanout(kind: &str, outcome: &str) {
    METRICS.fanout.with_label_values(&[kind, outcome]).inc();
}

/// Text exposition of every registered collector
fn render() -> prometheus::Result<Vec<u8>> {
    Lazy::force(&METRICS);
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}

pub async fn serve_metrics() -> HttpResponse {
    match render() {
        Ok(body) => HttpResponse::Ok()
            .content_type(TextEncoder::new().format_type())
            .body(body),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Counts requests and their latency per matched route pattern, so ids in
/// paths never become label values.
pub struct RequestMetrics;

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestMetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, inner: S) -> Self::Future {
        ready(Ok(RequestMetricsService {
            inner: Rc::new(inner),
        }))
    }
}

pub struct RequestMetricsService<S> {
    inner: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(inner);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let inner = Rc::clone(&self.inner);
        let method = req.method().clone();
        let started = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            let labels = match &result {
                Ok(res) => RequestLabels {
                    method,
                    route: res
                        .request()
                        .match_pattern()
                        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string()),
                    status: res.status().as_u16(),
                },
                Err(_) => RequestLabels {
                    method,
                    route: UNMATCHED_ROUTE.to_string(),
                    status: 500,
                },
            };
            labels.observe(started.elapsed());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    fn request_count(route: &str, status: &str) -> u64 {
        METRICS
            .http_requests
            .with_label_values(&["GET", route, status])
            .get()
    }

    #[::core::prelude::v1::test]
    fn test_record_operation_counts_by_label() {
        let before = METRICS
            .operations
            .with_label_values(&["metrics_test_op", "ok"])
            .get();
        record_operation("metrics_test_op", "ok");
        record_operation("metrics_test_op", "ok");
        record_fanout("follow", "suppressed");

        let after = METRICS
            .operations
            .with_label_values(&["metrics_test_op", "ok"])
            .get();
        assert_eq!(after - before, 2);
    }

    #[::core::prelude::v1::test]
    fn test_render_lists_service_metrics() {
        record_operation("metrics_test_render", "ok");
        let text = String::from_utf8(render().unwrap()).unwrap();
        assert!(text.contains("engagement_service_operations_total"));
        assert!(text.contains("metrics_test_render"));
    }

    #[actix_web::test]
    async fn test_middleware_labels_by_route_pattern() {
        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics)
                .route("/metrics-test/{id}", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let before = request_count("/metrics-test/{id}", "200");
        for id in ["a", "b"] {
            let req = test::TestRequest::get()
                .uri(&format!("/metrics-test/{id}"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }
        assert_eq!(request_count("/metrics-test/{id}", "200") - before, 2);

        let before = request_count(UNMATCHED_ROUTE, "404");
        let req = test::TestRequest::get().uri("/nowhere").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
        assert_eq!(request_count(UNMATCHED_ROUTE, "404") - before, 1);
    }
}
