pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::test_store::{PgTestStore, TestStore};
use crate::services::test_service::TestService;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub test_service: TestService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self::with_store(Arc::new(PgTestStore::new(pool)), &config.jwt_secret)
    }

    pub fn with_store(store: Arc<dyn TestStore>, jwt_secret: &str) -> Self {
        Self {
            test_service: TestService::new(store),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
