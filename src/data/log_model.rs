use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

pub type LogEntries = Vec<LogEntry>;

/// A single logged API request as it sits in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub api_id: Option<Uuid>,
    pub status_code: i32,
    pub response_time: f64,
    pub timestamp: DateTime<Utc>,
}

/// Transport form of a [`LogEntry`]: identifiers and time as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiLogEntry {
    pub id: String,
    pub user_id: String,
    pub api_id: Option<String>,
    pub status_code: i32,
    pub response_time: f64,
    pub timestamp: String,
}

impl From<LogEntry> for ApiLogEntry {
    fn from(e: LogEntry) -> Self {
        Self {
            id: e.id.to_string(),
            user_id: e.user_id.to_string(),
            api_id: e.api_id.map(|id| id.to_string()),
            status_code: e.status_code,
            response_time: e.response_time,
            timestamp: e.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPage {
    pub logs: Vec<ApiLogEntry>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub success_requests: u64,
    pub error_requests: u64,
    pub avg_response_time: f64,
}
