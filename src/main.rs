mod app_config;
mod auth;
mod data;
mod db;
mod logs;
mod service;

use std::sync::Arc;

use crate::app_config::AppConfig;
use crate::auth::{HeaderIdentityResolver, IdentityResolver};
use crate::db::scylladb::ScyllaDbService;

use axum::routing::get;
use config::FileFormat;
use log::info;
use service::{local::LocalLogStore, LogStore};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub identity: Arc<dyn IdentityResolver>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let config = AppConfig::init()
        .from_optional_file("config.toml", FileFormat::Toml)
        .from_env()
        .parse();
    let store: Arc<dyn LogStore> = if config.use_scylla {
        info!("Using ScyllaDB log store");
        Arc::new(
            ScyllaDbService::new(
                config.db_dc.clone(),
                config.db_url.clone(),
                config.schema_file.clone(),
            )
            .await,
        )
    } else {
        info!("Using local log store");
        match config.fixture_file.as_deref() {
            Some(path) => match LocalLogStore::from_file(path) {
                Ok(store) => Arc::new(store),
                Err(e) => panic!("Error loading log fixtures: {}", e),
            },
            None => Arc::new(LocalLogStore::init(Vec::new())),
        }
    };
    let identity = match HeaderIdentityResolver::new(&config.identity_header) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => panic!("Error loading config: {}", e),
    };
    info!(
        "Resolving caller identity from header {:?}",
        config.identity_header
    );

    info!("Starting server on {}:{}", config.host, config.port);
    let app = logs::router(AppState { store, identity }).route("/health", get(health));
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port))
        .await
        .unwrap_or_else(|e| panic!("Error binding {}:{}: {}", config.host, config.port, e));
    if let Err(e) = axum::serve(listener, app).await {
        panic!("Server error: {}", e);
    }
}

async fn health() -> &'static str {
    "OK"
}
