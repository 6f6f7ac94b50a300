use std::{fs, sync::Arc, time::Instant};

use axum::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{pin_mut, Stream, StreamExt};
use log::{debug, info};
use scylla::{
    frame::response::result::CqlValue, frame::value::CqlTimestamp,
    load_balancing::DefaultPolicy, query::Query, transport::Compression, ExecutionProfile,
    FromRow, Session, SessionBuilder,
};
use uuid::Uuid;

use crate::data::log_model::{LogEntries, LogEntry};
use crate::service::{LogFilter, LogStore};

const LOGS_TABLE: &str = "datalake.api_logs";
const LOG_COLUMNS: &str = "id, user_id, api_id, status_code, response_time, timestamp";
const FIND_PAGE_SIZE: i32 = 1000;

#[derive(Clone)]
pub struct ScyllaDbService {
    db_session: Arc<Session>,
}

#[derive(Debug, FromRow)]
struct LogRow {
    id: Uuid,
    user_id: Uuid,
    api_id: Option<Uuid>,
    status_code: i32,
    response_time: f64,
    timestamp: CqlTimestamp,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = anyhow::Error;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let timestamp = match DateTime::<Utc>::from_timestamp_millis(row.timestamp.0) {
            Some(ts) => ts,
            None => {
                return Err(anyhow::Error::msg(format!(
                    "timestamp out of range: {}",
                    row.timestamp.0
                )))
            }
        };
        Ok(LogEntry {
            id: row.id,
            user_id: row.user_id,
            api_id: row.api_id,
            status_code: row.status_code,
            response_time: row.response_time,
            timestamp,
        })
    }
}

/// WHERE clause and bound values for `filter`, plus whether the clause
/// touches non-key columns and needs ALLOW FILTERING.
fn where_clause(filter: &LogFilter) -> (String, Vec<CqlValue>, bool) {
    let mut clause = String::from("user_id = ?");
    let mut values = vec![CqlValue::Uuid(filter.user_id)];
    let mut needs_filtering = false;
    if let Some(api_id) = filter.api_id {
        clause.push_str(" AND api_id = ?");
        values.push(CqlValue::Uuid(api_id));
        needs_filtering = true;
    }
    if let Some(status) = filter.status {
        clause.push_str(" AND status_code >= ?");
        values.push(CqlValue::Int(status.min));
        if let Some(max) = status.max {
            clause.push_str(" AND status_code < ?");
            values.push(CqlValue::Int(max));
        }
        needs_filtering = true;
    }
    (clause, values, needs_filtering)
}

fn filtering_suffix(needs_filtering: bool) -> &'static str {
    if needs_filtering {
        " ALLOW FILTERING"
    } else {
        ""
    }
}

/// CQL has no OFFSET: read `skip + limit` rows and drop the first `skip`
/// while streaming them.
fn select_query(filter: &LogFilter, skip: u64, limit: u64) -> (String, Vec<CqlValue>) {
    let (clause, values, needs_filtering) = where_clause(filter);
    let fetch = i32::try_from(skip.saturating_add(limit)).unwrap_or(i32::MAX);
    let query = format!(
        "SELECT {} FROM {} WHERE {} LIMIT {}{}",
        LOG_COLUMNS,
        LOGS_TABLE,
        clause,
        fetch,
        filtering_suffix(needs_filtering)
    );
    (query, values)
}

/// Aggregate `select` (e.g. `COUNT(*)`) over the rows matching `filter`.
fn aggregate_query(select: &str, filter: &LogFilter) -> (String, Vec<CqlValue>) {
    let (clause, values, needs_filtering) = where_clause(filter);
    let query = format!(
        "SELECT {} FROM {} WHERE {}{}",
        select,
        LOGS_TABLE,
        clause,
        filtering_suffix(needs_filtering)
    );
    (query, values)
}

/// Drops the first `skip` rows of `rows` as they arrive and converts the rest.
async fn collect_after_skip<S, E>(rows: S, skip: u64) -> Result<LogEntries, anyhow::Error>
where
    S: Stream<Item = Result<LogRow, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    pin_mut!(rows);
    let mut skipped = 0u64;
    let mut entries = Vec::new();
    while let Some(row) = rows.next().await {
        let row = row?;
        if skipped < skip {
            skipped += 1;
            continue;
        }
        entries.push(LogEntry::try_from(row)?);
    }
    Ok(entries)
}

impl ScyllaDbService {
    pub async fn new(dc: String, host: String, schema_file: String) -> Self {
        info!("ScyllaDbService: connecting to {}. DC: {}.", host, dc);
        let policy = Arc::new(DefaultPolicy::default());
        let profile = ExecutionProfile::builder()
            .load_balancing_policy(policy)
            .build();
        let session: Session = SessionBuilder::new()
            .known_node(host.clone())
            .compression(Some(Compression::Lz4))
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await
            .expect("Error connecting to ScyllaDB");
        info!("ScyllaDbService: connected to {}. DC: {}.", host, dc);

        info!("ScyllaDbService: creating schema...");
        let schema = fs::read_to_string(&schema_file)
            .unwrap_or_else(|e| panic!("Error Reading Schema file {}: {}", schema_file, e));

        let schema_query = schema.trim().replace('\n', " ");

        for q in schema_query.split(';') {
            let query = q.trim();
            if !query.is_empty() {
                info!("Running Query: {}", query);
                session
                    .query(format!("{};", query), ())
                    .await
                    .expect("Error creating schema!");
            }
        }

        Self {
            db_session: Arc::new(session),
        }
    }
}

#[async_trait]
impl LogStore for ScyllaDbService {
    async fn find(
        &self,
        filter: &LogFilter,
        skip: u64,
        limit: u64,
    ) -> Result<LogEntries, anyhow::Error> {
        let now = Instant::now();
        let (query, values) = select_query(filter, skip, limit);
        debug!("ScyllaDbService: find: {}", query);
        let mut query = Query::new(query);
        query.set_page_size(FIND_PAGE_SIZE);
        let rows = self
            .db_session
            .query_iter(query, values)
            .await?
            .into_typed::<LogRow>();
        let entries = collect_after_skip(rows, skip).await?;
        debug!(
            "ScyllaDbService: find: {} rows. Took: {:.2?}",
            entries.len(),
            now.elapsed()
        );
        Ok(entries)
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, anyhow::Error> {
        let (query, values) = aggregate_query("COUNT(*)", filter);
        debug!("ScyllaDbService: count: {}", query);
        let (count,) = self
            .db_session
            .query(query, values)
            .await?
            .single_row_typed::<(i64,)>()?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn average_response_time(
        &self,
        filter: &LogFilter,
    ) -> Result<Option<f64>, anyhow::Error> {
        let (query, values) = aggregate_query("COUNT(*), AVG(response_time)", filter);
        debug!("ScyllaDbService: average_response_time: {}", query);
        let (count, avg) = self
            .db_session
            .query(query, values)
            .await?
            .single_row_typed::<(i64, Option<f64>)>()?;
        if count == 0 {
            return Ok(None);
        }
        Ok(avg)
    }
}
