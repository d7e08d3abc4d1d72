//! Reference implementation of the VoxTask task service.
//!
//! Serves `GET /health`, `GET/POST /tasks` and `PATCH/DELETE /tasks/{id}`
//! from an in-memory store. Used by the client integration tests and for
//! local development.

pub mod api;
pub mod errors;
pub mod store;

use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use voxtask_core::routes;

pub use errors::{ApiError, ServerError, ServerResult};
pub use store::TaskStore;

pub struct AppState {
    pub store: TaskStore,
}

impl AppState {
    pub fn new(task_quota: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            store: TaskStore::new(task_quota),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(routes::HEALTH, get(api::health))
        .route(routes::TASKS, get(api::list_tasks).post(api::create_task))
        .route(
            "/tasks/:id",
            patch(api::update_task).delete(api::delete_task),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the API on an already bound listener until the process ends.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> ServerResult<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Starting task server on {}", addr);
    }
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", "Bearer alice")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(AppState::new(None));
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert!(body["timestamp"].is_f64());
    }

    #[tokio::test]
    async fn test_create_then_patch() {
        let state = AppState::new(None);
        let (status, created) = send(
            router(state.clone()),
            json_request(
                "POST",
                "/tasks",
                json!({"title": "  Book dentist ", "deadline": "2024-10-01", "tags": ["health", "health"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["title"], json!("Book dentist"));
        assert_eq!(created["tags"], json!(["health"]));
        assert_eq!(created["status"], json!("todo"));
        assert_eq!(created["ownerId"], json!("alice"));

        let id = created["id"].as_str().unwrap();
        let (status, patched) = send(
            router(state.clone()),
            json_request("PATCH", &format!("/tasks/{}", id), json!({"status": "in progress"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["status"], json!("in progress"));
        assert_eq!(patched["title"], json!("Book dentist"));
    }

    #[tokio::test]
    async fn test_error_bodies_carry_detail() {
        let state = AppState::new(Some(0));

        let (status, body) = send(
            router(state.clone()),
            json_request("POST", "/tasks", json!({"title": "x", "deadline": "2024-10-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], json!("Task quota exceeded"));

        let (status, body) = send(
            router(state.clone()),
            json_request("DELETE", "/tasks/missing", Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], json!("Task not found"));

        let (status, _) = send(
            router(state),
            json_request("POST", "/tasks", json!({"title": "   ", "deadline": "2024-10-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
