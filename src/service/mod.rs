use axum::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::data::log_model::{LogEntries, LogEntry};

pub mod local;
pub mod query;

/// Status code window, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    pub min: i32,
    pub max: Option<i32>,
}

impl StatusRange {
    pub const SUCCESS: StatusRange = StatusRange {
        min: 200,
        max: Some(300),
    };
    pub const ERROR: StatusRange = StatusRange { min: 400, max: None };

    pub fn contains(&self, code: i32) -> bool {
        code >= self.min && self.max.map_or(true, |max| code < max)
    }
}

/// Match conditions applied when reading a caller's logs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFilter {
    pub user_id: Uuid,
    pub api_id: Option<Uuid>,
    pub status: Option<StatusRange>,
}

impl LogFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            api_id: None,
            status: None,
        }
    }

    pub fn with_api(mut self, api_id: Uuid) -> Self {
        self.api_id = Some(api_id);
        self
    }

    pub fn with_status(mut self, status: StatusRange) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        entry.user_id == self.user_id
            && self.api_id.map_or(true, |api_id| entry.api_id == Some(api_id))
            && self.status.map_or(true, |s| s.contains(entry.status_code))
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Entries matching `filter`, newest first, after skipping `skip` of them.
    async fn find(
        &self,
        filter: &LogFilter,
        skip: u64,
        limit: u64,
    ) -> Result<LogEntries, anyhow::Error>;
    async fn count(&self, filter: &LogFilter) -> Result<u64, anyhow::Error>;
    /// Mean response time over the matching entries, `None` when nothing matches.
    async fn average_response_time(&self, filter: &LogFilter)
        -> Result<Option<f64>, anyhow::Error>;
}
