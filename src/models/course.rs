use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Parent of tests. Managed elsewhere; only read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
