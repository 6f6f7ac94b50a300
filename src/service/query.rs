use std::fmt;

use log::debug;
use serde::Deserialize;
use uuid::Uuid;

use crate::data::log_model::{ApiLogEntry, LogPage, UsageStats};

use super::{LogFilter, LogStore, StatusRange};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const INVALID_API_ID: &str = "Invalid API ID";

/// Query string of the log listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub api_id: Option<String>,
}

#[derive(Debug)]
pub enum QueryError {
    InvalidArgument(&'static str),
    Store(anyhow::Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidArgument(msg) => write!(f, "{}", msg),
            QueryError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl From<anyhow::Error> for QueryError {
    fn from(e: anyhow::Error) -> Self {
        QueryError::Store(e)
    }
}

/// An empty `api_id` counts as no filter.
pub fn parse_api_id(raw: Option<&str>) -> Result<Option<Uuid>, QueryError> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| QueryError::InvalidArgument(INVALID_API_ID)),
    }
}

pub fn page_count(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1)))
}

/// Two decimal places, ties to even.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

pub async fn list_logs(
    store: &dyn LogStore,
    user_id: Uuid,
    query: &LogQuery,
) -> Result<LogPage, QueryError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let mut filter = LogFilter::for_user(user_id);
    if let Some(api_id) = parse_api_id(query.api_id.as_deref())? {
        filter = filter.with_api(api_id);
    }

    let skip = u64::from(page - 1).saturating_mul(u64::from(limit));
    let entries = store.find(&filter, skip, u64::from(limit)).await?;
    let total = store.count(&filter).await?;
    debug!(
        "list_logs: user={} page={} limit={} returned={} total={}",
        user_id,
        page,
        limit,
        entries.len(),
        total
    );

    Ok(LogPage {
        logs: entries.into_iter().map(ApiLogEntry::from).collect(),
        total,
        page,
        pages: page_count(total, limit),
    })
}

pub async fn usage_stats(store: &dyn LogStore, user_id: Uuid) -> Result<UsageStats, QueryError> {
    let all = LogFilter::for_user(user_id);
    let total_requests = store.count(&all).await?;
    let success_requests = store
        .count(&all.clone().with_status(StatusRange::SUCCESS))
        .await?;
    let error_requests = store
        .count(&all.clone().with_status(StatusRange::ERROR))
        .await?;
    let avg_response_time = if total_requests == 0 {
        0.0
    } else {
        store.average_response_time(&all).await?.unwrap_or(0.0)
    };

    Ok(UsageStats {
        total_requests,
        success_requests,
        error_requests,
        avg_response_time: round2(avg_response_time),
    })
}
