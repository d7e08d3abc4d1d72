use crate::errors::ServerResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use voxtask_core::models::{Task, TaskFormData, TaskUpdate};

/// Owner used when a request carries no bearer token.
pub const ANONYMOUS_OWNER: &str = "anonymous";

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: f64,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    status: &'static str,
    message: String,
}

/// Tasks are scoped by the bearer token; the token itself names the owner.
pub fn owner_of(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .unwrap_or(ANONYMOUS_OWNER)
        .to_string()
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
    })
}

pub async fn list_tasks(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Vec<Task>> {
    Json(state.store.list(&owner_of(&headers)))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(data): Json<TaskFormData>,
) -> ServerResult<Json<Task>> {
    let owner = owner_of(&headers);
    let data = data.validated()?;
    let task = state.store.create(&owner, &data)?;
    tracing::info!("SERVER: {} created task {}", owner, task.id);
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> ServerResult<Json<Task>> {
    let owner = owner_of(&headers);
    let update = update.validated()?;
    let task = state.store.update(&owner, &id, &update)?;
    tracing::debug!("SERVER: {} updated task {}", owner, id);
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ServerResult<Json<DeleteResponse>> {
    let owner = owner_of(&headers);
    state.store.delete(&owner, &id)?;
    tracing::info!("SERVER: {} deleted task {}", owner, id);
    Ok(Json(DeleteResponse {
        status: "success",
        message: format!("Task {} deleted", id),
    }))
}
