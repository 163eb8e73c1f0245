//! HTTP server for statelog.
//!
//! A thin axum layer over an [`statelog_store::ObjectStore`]: it parses the
//! object id and state label, delegates to the store on the blocking pool,
//! and maps store failures to status codes (validation → 400, not found →
//! 404, storage unavailable → 500).

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::StatelogServer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use statelog_store::{
        InMemoryObjectStore, ObjectStore, SqliteObjectStore, StoreError, StoreResult,
    };
    use statelog_types::{HistoryEntry, ObjectId, StateLabel, TrackedObject};
    use tower::util::ServiceExt;

    use super::*;

    fn app() -> Router {
        router::build_router(AppState::new(Arc::new(InMemoryObjectStore::new())))
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn create(app: &Router) -> i64 {
        let (status, body) = send(app, Method::POST, "/create").await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    async fn history(app: &Router, id: i64) -> Vec<Value> {
        let (status, body) = send(app, Method::GET, &format!("/history/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    /// Fails every operation as if the database were gone.
    struct UnavailableStore;

    impl ObjectStore for UnavailableStore {
        fn create_object(&self) -> StoreResult<ObjectId> {
            Err(StoreError::StorageUnavailable("disk I/O error".into()))
        }

        fn update_object_state(
            &self,
            _id: ObjectId,
            _new_state: &StateLabel,
        ) -> StoreResult<HistoryEntry> {
            Err(StoreError::StorageUnavailable("disk I/O error".into()))
        }

        fn get_object(&self, _id: ObjectId) -> StoreResult<TrackedObject> {
            Err(StoreError::StorageUnavailable("disk I/O error".into()))
        }

        fn get_object_history(&self, _id: ObjectId) -> StoreResult<Vec<HistoryEntry>> {
            Err(StoreError::StorageUnavailable("disk I/O error".into()))
        }

        fn get_object_with_history(
            &self,
            _id: ObjectId,
        ) -> StoreResult<(TrackedObject, Vec<HistoryEntry>)> {
            Err(StoreError::StorageUnavailable("disk I/O error".into()))
        }

        fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
            Err(StoreError::StorageUnavailable("disk I/O error".into()))
        }
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(&app(), Method::GET, "/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (status, _) = send(&app(), Method::GET, "/v1/info").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_returns_positive_id() {
        let app = app();
        assert_eq!(create(&app).await, 1);
        assert_eq!(create(&app).await, 2);
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let app = app();
        let id = create(&app).await;
        assert_eq!(id, 1);

        let first = history(&app, id).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["change_id"], 1);
        assert_eq!(first[0]["state"], "created");

        let (status, body) = send(&app, Method::PUT, "/edit/1?newState=updated").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let entries = history(&app, id).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["change_id"], 2);
        assert_eq!(entries[1]["state"], "updated");
        let t0 = entries[0]["timestamp"].as_str().unwrap();
        let t1 = entries[1]["timestamp"].as_str().unwrap();
        assert!(t1 >= t0);
        assert_eq!(entries[0].as_object().unwrap().len(), 3);

        let (status, _) = send(&app, Method::PUT, "/edit/999?newState=x").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(&app, Method::GET, "/history/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "object not found: 999");
    }

    #[tokio::test]
    async fn edit_requires_new_state() {
        let app = app();
        let id = create(&app).await;

        let (status, _) = send(&app, Method::PUT, &format!("/edit/{id}?newState=")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, Method::PUT, &format!("/edit/{id}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(history(&app, id).await.len(), 1);
    }

    #[tokio::test]
    async fn whitespace_state_is_stored_verbatim() {
        let app = app();
        let id = create(&app).await;

        let (status, _) = send(&app, Method::PUT, &format!("/edit/{id}?newState=%20")).await;
        assert_eq!(status, StatusCode::OK);

        let entries = history(&app, id).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["state"], " ");
    }

    #[tokio::test]
    async fn empty_state_rejected_before_lookup() {
        let (status, _) = send(&app(), Method::PUT, "/edit/999?newState=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let app = app();
        for uri in ["/history/abc", "/history/0", "/history/-3", "/objects/1.5"] {
            let (status, _) = send(&app, Method::GET, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
        let (status, _) = send(&app, Method::PUT, "/edit/zero?newState=x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn object_endpoint_shows_current_state() {
        let app = app();
        let id = create(&app).await;
        send(&app, Method::PUT, &format!("/edit/{id}?newState=shipped")).await;

        let (status, body) = send(&app, Method::GET, &format!("/objects/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "id": id, "state": "shipped" }));

        let (status, _) = send(&app, Method::GET, "/objects/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn storage_failure_is_server_error() {
        let app = router::build_router(AppState::new(Arc::new(UnavailableStore)));
        let (status, body) = send(&app, Method::POST, "/create").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].as_str().unwrap().contains("storage unavailable"));

        let (status, _) = send(&app, Method::GET, "/history/1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_edits_on_sqlite() {
        let store = Arc::new(SqliteObjectStore::in_memory().unwrap());
        let app = router::build_router(AppState::new(store.clone()));
        let id = create(&app).await;

        let edits: Vec<_> = (0..10)
            .map(|n| {
                let app = app.clone();
                tokio::spawn(async move {
                    send(&app, Method::PUT, &format!("/edit/{id}?newState=s{n}")).await.0
                })
            })
            .collect();
        for edit in edits {
            assert_eq!(edit.await.unwrap(), StatusCode::OK);
        }

        let entries = history(&app, id).await;
        assert_eq!(entries.len(), 11);
        let ids: Vec<i64> = entries.iter().map(|e| e["change_id"].as_i64().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let current = store.get_object(ObjectId::new(id).unwrap()).unwrap();
        assert_eq!(entries[10]["state"], current.state.as_str());
        assert!(store.integrity_summary().unwrap().is_consistent());
    }
}
