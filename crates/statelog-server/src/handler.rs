use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use statelog_store::{ObjectStore, StoreResult};
use statelog_types::{HistoryEntry, ObjectId, StateLabel, TrackedObject};

use crate::error::{ServerError, ServerResult};

/// Shared handler state: the store every request delegates to.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Run a store call on the blocking pool. Store operations are
    /// synchronous and may wait on the database write lock.
    async fn run<T, F>(&self, op: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ObjectStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?
            .map_err(ServerError::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct EditParams {
    #[serde(rename = "newState")]
    pub new_state: Option<String>,
}

fn parse_id(raw: &str) -> ServerResult<ObjectId> {
    Ok(raw.parse::<ObjectId>()?)
}

/// `POST /create` — body is the new object's id.
pub async fn create_handler(State(state): State<AppState>) -> ServerResult<Json<ObjectId>> {
    let id = state.run(|store| store.create_object()).await?;
    tracing::info!(object_id = %id, "object created");
    Ok(Json(id))
}

/// `PUT /edit/{id}?newState=...` — empty body on success.
pub async fn edit_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<EditParams>,
) -> ServerResult<StatusCode> {
    let id = parse_id(&raw_id)?;
    let new_state = StateLabel::new(params.new_state.unwrap_or_default())?;
    let entry = state
        .run(move |store| store.update_object_state(id, &new_state))
        .await?;
    tracing::info!(object_id = %id, change_id = %entry.change_id, "object state changed");
    Ok(StatusCode::OK)
}

/// `GET /history/{id}` — entries ordered by change id.
pub async fn history_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ServerResult<Json<Vec<HistoryEntry>>> {
    let id = parse_id(&raw_id)?;
    let history = state.run(move |store| store.get_object_history(id)).await?;
    Ok(Json(history))
}

/// `GET /objects/{id}` — current state.
pub async fn object_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ServerResult<Json<TrackedObject>> {
    let id = parse_id(&raw_id)?;
    let object = state.run(move |store| store.get_object(id)).await?;
    Ok(Json(object))
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "statelog-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
