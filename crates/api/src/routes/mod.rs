//! HTTP route handlers for the contacts API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                 - Status payload
//! GET    /health           - Liveness check
//! GET    /health/ready     - Readiness check (pings the store)
//! GET    /metrics          - Prometheus request metrics
//! GET    /me               - Verified caller (only with an Auth Gate client)
//!
//! # Contacts (Auth Gate attached when CONTACTS_REQUIRE_AUTH=true)
//! GET    /contacts         - List all contacts
//! POST   /contacts         - Create a contact
//! GET    /contacts/{id}    - Get a contact
//! PATCH  /contacts/{id}    - Replace a contact
//! DELETE /contacts/{id}    - Delete a contact
//! ```

pub mod contacts;
pub mod health;
pub mod me;

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::get,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::CorsOrigins;
use crate::metrics;
use crate::middleware::{request_id_middleware, require_auth};
use crate::state::AppState;

/// Create the contact routes router.
///
/// The Auth Gate is attached as a `route_layer` so unmatched paths still 404
/// instead of 401.
pub fn contact_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/contacts", get(contacts::list).post(contacts::create))
        .route(
            "/contacts/{id}",
            get(contacts::get)
                .patch(contacts::update)
                .delete(contacts::delete),
        );

    if state.config().auth.require_auth {
        routes.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
    } else {
        routes
    }
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::HeaderName::from_static(
            crate::middleware::request_id::REQUEST_ID_HEADER,
        )])
}

/// Build the complete application router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics::expose))
        .merge(contact_routes(&state));

    if state.verifier().is_some() {
        app = app.route("/me", get(me::me));
    }

    let cors = cors_layer(&state.config().cors_origins);

    app.layer(middleware::from_fn_with_state(state.clone(), metrics::track_requests))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::db::InMemoryContactRepository;
    use crate::services::auth::{TokenVerifier, test_tokens};
    use crate::testing::test_config;

    struct TestApp {
        repo: Arc<InMemoryContactRepository>,
        router: Router,
    }

    impl TestApp {
        fn new() -> Self {
            Self::build(false, None)
        }

        fn with_auth() -> Self {
            let verifier: Arc<dyn TokenVerifier> = Arc::new(test_tokens::test_verifier());
            Self::build(true, Some(verifier))
        }

        fn build(require_auth: bool, verifier: Option<Arc<dyn TokenVerifier>>) -> Self {
            let repo = Arc::new(InMemoryContactRepository::new());
            let state = AppState::new(test_config(require_auth), repo.clone(), verifier);
            Self {
                repo,
                router: router(state),
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            read(self.send(request).await).await
        }
    }

    async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn tony() -> Value {
        json!({
            "first_name": "Tony",
            "last_name": "Stark",
            "company": "Stark Industries",
            "telephone": "212-970-4133",
            "email": "tony@starkindustries.com",
            "address": "10880 Malibu Point, Malibu, CA 90265",
            "notes": "some note blah blah blah"
        })
    }

    #[tokio::test]
    async fn test_status_endpoints() {
        let app = TestApp::new();

        let (status, body) = app.call("GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "OK", "message": "Contact API is running"}));

        let (status, body) = app.call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "message": "API is operational"}));
    }

    #[tokio::test]
    async fn test_readiness_follows_store() {
        let app = TestApp::new();
        let (status, _) = app.call("GET", "/health/ready", None).await;
        assert_eq!(status, StatusCode::OK);

        app.repo.set_unavailable(true).await;
        let (status, _) = app.call("GET", "/health/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_create_echoes_fields_and_assigns_id() {
        let app = TestApp::new();
        let (status, body) = app.call("POST", "/contacts", Some(tony())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["id"].as_i64().is_some());
        for (key, value) in tony().as_object().unwrap() {
            assert_eq!(&body[key], value, "{key}");
        }
    }

    #[tokio::test]
    async fn test_create_with_only_names_stores_nulls() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                "POST",
                "/contacts",
                Some(json!({"first_name": "Bilbo", "last_name": "Baggins"})),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["email"].is_null());
        assert!(body["notes"].is_null());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let app = TestApp::new();

        let (status, _) = app.call("POST", "/contacts", Some(tony())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.call("POST", "/contacts", Some(tony())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Contact already exists");

        let (_, list) = app.call("GET", "/contacts", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_names_different_email_are_distinct() {
        let app = TestApp::new();
        let mut other = tony();
        other["email"] = json!("ironman@avengers.org");

        let (first, _) = app.call("POST", "/contacts", Some(tony())).await;
        let (second, _) = app.call("POST", "/contacts", Some(other)).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_body_id_is_ignored() {
        let app = TestApp::new();
        let mut body = tony();
        body["id"] = json!(999);

        let (status, created) = app.call("POST", "/contacts", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(created["id"], 999);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let app = TestApp::new();
        for id in [0, 1, 42, -7] {
            let (status, body) = app.call("GET", &format!("/contacts/{id}"), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["detail"], "Contact not found");
        }
    }

    #[tokio::test]
    async fn test_out_of_range_id_is_not_found() {
        let app = TestApp::new();
        app.call("POST", "/contacts", Some(tony())).await;

        for id in ["2147483648", "-2147483649", "9223372036854775807"] {
            let uri = format!("/contacts/{id}");

            let (status, body) = app.call("GET", &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "GET {id}");
            assert_eq!(body["detail"], "Contact not found");

            let (status, _) = app.call("PATCH", &uri, Some(tony())).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "PATCH {id}");

            let (status, _) = app.call("DELETE", &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "DELETE {id}");
        }

        let (_, list) = app.call("GET", "/contacts", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_is_identical() {
        let app = TestApp::new();
        let (_, created) = app.call("POST", "/contacts", Some(tony())).await;

        let (status, fetched) = app
            .call("GET", &format!("/contacts/{}", created["id"]), None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_patch_replaces_every_field() {
        let app = TestApp::new();
        let (_, created) = app.call("POST", "/contacts", Some(tony())).await;
        let uri = format!("/contacts/{}", created["id"]);

        let replacement = json!({
            "first_name": "Anthony",
            "last_name": "Stark",
            "email": "tony@starkindustries.com"
        });
        let (status, updated) = app.call("PATCH", &uri, Some(replacement)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, fetched) = app.call("GET", &uri, None).await;
        assert_eq!(fetched, updated);
        assert_eq!(fetched["id"], created["id"]);
        assert_eq!(fetched["first_name"], "Anthony");
        assert!(fetched["company"].is_null());
        assert!(fetched["telephone"].is_null());
        assert!(fetched["notes"].is_null());
    }

    #[tokio::test]
    async fn test_patch_unknown_id_is_not_found() {
        let app = TestApp::new();
        let (status, _) = app.call("PATCH", "/contacts/12", Some(tony())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_onto_another_identity_conflicts() {
        let app = TestApp::new();
        app.call("POST", "/contacts", Some(tony())).await;
        let (_, other) = app
            .call(
                "POST",
                "/contacts",
                Some(json!({"first_name": "Peter", "last_name": "Parker"})),
            )
            .await;

        let (status, _) = app
            .call("PATCH", &format!("/contacts/{}", other["id"]), Some(tony()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let app = TestApp::new();
        let (_, created) = app.call("POST", "/contacts", Some(tony())).await;
        let uri = format!("/contacts/{}", created["id"]);

        let (status, body) = app.call("DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Contact deleted"}));

        let (status, _) = app.call("GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.call("DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let app = TestApp::new();
        for (first, last) in [("Luke", "Skywalker"), ("Walter", "White"), ("Mary", "Poppins")] {
            app.call(
                "POST",
                "/contacts",
                Some(json!({"first_name": first, "last_name": last})),
            )
            .await;
        }

        let (status, list) = app.call("GET", "/contacts", None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_invalid_bodies_are_unprocessable() {
        let app = TestApp::new();

        let (status, _) = app
            .call("POST", "/contacts", Some(json!({"first_name": "Harry"})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = app
            .call(
                "POST",
                "/contacts",
                Some(json!({"first_name": "", "last_name": "Potter"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "first_name cannot be empty");

        let (status, body) = app
            .call(
                "POST",
                "/contacts",
                Some(json!({"first_name": "  ", "last_name": "Potter"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["first_name"], "  ");

        let request = Request::post("/contacts")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = read(app.send(request).await).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_unprocessable() {
        let app = TestApp::new();
        let (status, _) = app.call("GET", "/contacts/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_storage_failure_is_generic() {
        let app = TestApp::new();
        app.repo.set_unavailable(true).await;

        let (status, body) = app.call("GET", "/contacts", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");

        let (status, _) = app.call("POST", "/contacts", Some(tony())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_contacts_are_open_without_auth() {
        let app = TestApp::new();
        let (status, _) = app.call("GET", "/contacts", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.call("GET", "/me", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_required_auth_rejects_missing_token() {
        let app = TestApp::with_auth();
        let response = app
            .send(Request::get("/contacts").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
    }

    #[tokio::test]
    async fn test_required_auth_rejects_bad_token() {
        let app = TestApp::with_auth();
        let request = Request::get("/contacts")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();

        let (status, body) = read(app.send(request).await).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid authentication credentials");
    }

    #[tokio::test]
    async fn test_required_auth_accepts_valid_token() {
        let app = TestApp::with_auth();
        let token = test_tokens::token_for("uid-42");

        let request = Request::post("/contacts")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(tony().to_string()))
            .unwrap();
        let (status, _) = read(app.send(request).await).await;
        assert_eq!(status, StatusCode::CREATED);

        let request = Request::get("/me")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = read(app.send(request).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["uid"], "uid-42");
    }

    #[tokio::test]
    async fn test_status_endpoints_stay_public_with_auth() {
        let app = TestApp::with_auth();
        let (status, _) = app.call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_required_auth_without_verifier_is_unavailable() {
        let app = TestApp::build(true, None);
        let request = Request::get("/contacts")
            .header("authorization", "Bearer something")
            .body(Body::empty())
            .unwrap();

        let (status, _) = read(app.send(request).await).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_count_requests_by_route() {
        let app = TestApp::new();
        app.call("POST", "/contacts", Some(tony())).await;
        app.call("GET", "/contacts/1", None).await;
        app.call("GET", "/contacts/99", None).await;

        let response = app
            .send(Request::get("/metrics").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let count_line = |method: &str, handler: &str, status: &str| {
            text.lines()
                .find(|line| {
                    line.starts_with("http_requests_total{")
                        && line.contains(&format!(r#"method="{method}""#))
                        && line.contains(&format!(r#"handler="{handler}""#))
                        && line.contains(&format!(r#"status="{status}""#))
                })
                .map(str::to_owned)
        };

        assert!(count_line("POST", "/contacts", "2xx").unwrap().ends_with(" 1"), "{text}");
        assert!(count_line("GET", "/contacts/{id}", "2xx").unwrap().ends_with(" 1"), "{text}");
        assert!(count_line("GET", "/contacts/{id}", "4xx").unwrap().ends_with(" 1"), "{text}");
        assert!(text.contains("http_request_duration_seconds"), "{text}");
    }

    #[tokio::test]
    async fn test_metrics_stay_public_with_auth() {
        let app = TestApp::with_auth();
        let (status, _) = app.call("GET", "/contacts", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let response = app
            .send(Request::get("/metrics").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let app = TestApp::new();
        let response = app
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert!(response.headers().contains_key("x-request-id"));
    }
}
