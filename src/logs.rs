use axum::{
    debug_handler,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{debug, error};
use serde_json::json;

use crate::auth::Caller;
use crate::data::log_model::{LogPage, UsageStats};
use crate::service::query::{self, LogQuery, QueryError};
use crate::AppState;

pub const INVALID_QUERY: &str = "Invalid query parameters";

#[derive(Debug)]
pub enum AppError {
    Unauthorized(&'static str),
    InvalidArgument(&'static str),
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            QueryError::Store(e) => {
                error!("log store error: {:?}", e);
                AppError::InternalServerError
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs", get(list_logs_handler))
        .route("/api/logs/", get(list_logs_handler))
        .route("/api/logs/stats", get(stats_handler))
        .with_state(state)
}

#[debug_handler(state = AppState)]
pub async fn list_logs_handler(
    Caller(user_id): Caller,
    State(s): State<AppState>,
    params: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<LogPage>, AppError> {
    let Query(params) = params.map_err(|e| {
        debug!("list_logs: rejecting query string: {}", e);
        AppError::InvalidArgument(INVALID_QUERY)
    })?;
    let page = query::list_logs(s.store.as_ref(), user_id, &params).await?;
    Ok(Json(page))
}

#[debug_handler(state = AppState)]
pub async fn stats_handler(
    Caller(user_id): Caller,
    State(s): State<AppState>,
) -> Result<Json<UsageStats>, AppError> {
    let stats = query::usage_stats(s.store.as_ref(), user_id).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::HeaderIdentityResolver;
    use crate::data::log_model::LogEntry;
    use crate::service::{local::LocalLogStore, MockLogStore};

    use super::*;

    fn entry(user_id: Uuid, api_id: Option<Uuid>, status_code: i32, minute: i64) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            user_id,
            api_id,
            status_code,
            response_time: 10.0 + minute as f64,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    fn app(entries: Vec<LogEntry>) -> Router {
        router(AppState {
            store: Arc::new(LocalLogStore::init(entries)),
            identity: Arc::new(HeaderIdentityResolver::new("x-user-id").unwrap()),
        })
    }

    async fn get_json(app: Router, uri: &str, user: Option<Uuid>) -> (StatusCode, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(user) = user {
            req = req.header("x-user-id", user.to_string());
        }
        let res = app
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_logs_paginates_newest_first() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut entries: Vec<LogEntry> = (0..25).map(|i| entry(user, None, 200, i)).collect();
        entries.push(entry(other, None, 200, 100));

        let (status, body) = get_json(app(entries), "/api/logs/?page=2&limit=20", Some(user)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 25);
        assert_eq!(body["page"], 2);
        assert_eq!(body["pages"], 2);
        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 5);
        let stamps: Vec<&str> = logs.iter().map(|l| l["timestamp"].as_str().unwrap()).collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);
        assert!(logs.iter().all(|l| l["user_id"] == user.to_string()));
    }

    #[tokio::test]
    async fn test_list_logs_filters_by_api_id() {
        let user = Uuid::new_v4();
        let api = Uuid::new_v4();
        let entries = vec![
            entry(user, Some(api), 200, 0),
            entry(user, Some(Uuid::new_v4()), 200, 1),
            entry(user, None, 500, 2),
            entry(user, Some(api), 404, 3),
        ];

        let uri = format!("/api/logs?api_id={}", api);
        let (status, body) = get_json(app(entries), &uri, Some(user)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["pages"], 1);
        let logs = body["logs"].as_array().unwrap();
        assert!(logs.iter().all(|l| l["api_id"] == api.to_string()));
    }

    #[tokio::test]
    async fn test_list_logs_empty() {
        let (status, body) = get_json(app(vec![]), "/api/logs/", Some(Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["logs"], json!([]));
        assert_eq!(body["total"], 0);
        assert_eq!(body["page"], 1);
        assert_eq!(body["pages"], 0);
    }

    #[tokio::test]
    async fn test_list_logs_invalid_api_id() {
        let app = router(AppState {
            store: Arc::new(MockLogStore::new()),
            identity: Arc::new(HeaderIdentityResolver::new("x-user-id").unwrap()),
        });

        let (status, body) =
            get_json(app, "/api/logs/?api_id=not-a-valid-id", Some(Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid API ID" }));
    }

    #[tokio::test]
    async fn test_requires_identity() {
        let (status, body) = get_json(app(vec![]), "/api/logs/stats", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let mut store = MockLogStore::new();
        store
            .expect_count()
            .returning(|_| Err(anyhow::Error::msg("unavailable")));
        let app = router(AppState {
            store: Arc::new(store),
            identity: Arc::new(HeaderIdentityResolver::new("x-user-id").unwrap()),
        });

        let (status, body) = get_json(app, "/api/logs/stats", Some(Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_stats() {
        let user = Uuid::new_v4();
        let entries = vec![
            entry(user, None, 200, 0),
            entry(user, None, 201, 1),
            entry(user, None, 302, 2),
            entry(user, None, 404, 3),
            entry(user, None, 503, 4),
            entry(user, None, 102, 5),
            entry(Uuid::new_v4(), None, 500, 6),
        ];

        let (status, body) = get_json(app(entries), "/api/logs/stats", Some(user)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "total_requests": 6,
                "success_requests": 2,
                "error_requests": 2,
                "avg_response_time": 12.5,
            })
        );
    }

    #[tokio::test]
    async fn test_stats_no_entries() {
        let (status, body) = get_json(app(vec![]), "/api/logs/stats", Some(Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "total_requests": 0,
                "success_requests": 0,
                "error_requests": 0,
                "avg_response_time": 0.0,
            })
        );
    }

    #[tokio::test]
    async fn test_list_logs_malformed_paging_is_json_error() {
        for uri in ["/api/logs/?page=abc", "/api/logs/?limit=-5", "/api/logs?page=1.5"] {
            let (status, body) = get_json(app(vec![]), uri, Some(Uuid::new_v4())).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body, json!({ "error": INVALID_QUERY }), "{}", uri);
        }
    }
}
