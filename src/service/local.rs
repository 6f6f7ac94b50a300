use axum::async_trait;
use log::{debug, info};

use crate::data::log_model::LogEntries;

use super::{LogFilter, LogStore};

/// Store backed by a JSON file of log entries, held in memory.
pub struct LocalLogStore {
    entries: LogEntries,
}

impl LocalLogStore {
    pub fn init(mut entries: LogEntries) -> Self {
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        Self { entries }
    }

    pub fn from_file(path: &str) -> Result<Self, anyhow::Error> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => return Err(anyhow::Error::msg(format!("Error reading file: {}", e))),
        };
        let entries: LogEntries = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => return Err(anyhow::Error::msg(format!("Error parsing log file: {}", e))),
        };
        info!("LocalLogStore: loaded {} entries from {}", entries.len(), path);
        Ok(Self::init(entries))
    }
}

#[async_trait]
impl LogStore for LocalLogStore {
    async fn find(
        &self,
        filter: &LogFilter,
        skip: u64,
        limit: u64,
    ) -> Result<LogEntries, anyhow::Error> {
        debug!("LocalLogStore: find {:?} skip={} limit={}", filter, skip, limit);
        Ok(self
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, anyhow::Error> {
        Ok(self.entries.iter().filter(|e| filter.matches(e)).count() as u64)
    }

    async fn average_response_time(
        &self,
        filter: &LogFilter,
    ) -> Result<Option<f64>, anyhow::Error> {
        let (sum, n) = self
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .fold((0.0, 0u64), |(sum, n), e| (sum + e.response_time, n + 1));
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(sum / n as f64))
    }
}
