use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::{course::Course, question::Question, test::Test};

pub const PER_PAGE: i64 = 20;

/// Body of create and update. Unknown fields are dropped by serde, so only
/// these four columns can ever be written. String fields are trimmed on the
/// way in and a blank one counts as missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TestPayload {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(min = 1, max = 191))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(min = 1, max = 191))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(min = 1))]
    pub duration: Option<String>,
    #[validate(required)]
    pub course_id: Option<i64>,
}

fn trimmed<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

/// A payload that passed [`Validate`]; every field is present.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFields {
    pub name: String,
    pub description: String,
    pub duration: String,
    pub course_id: i64,
}

impl TestPayload {
    pub fn into_fields(self) -> Option<TestFields> {
        Some(TestFields {
            name: self.name?,
            description: self.description?,
            duration: self.duration?,
            course_id: self.course_id?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchDeletePayload {
    #[validate(length(min = 1))]
    #[serde(default)]
    pub batch_delete: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
}

impl SearchQuery {
    /// The search term, if one was given and is not empty.
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub course_id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<Course>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
}

impl TestResponse {
    pub fn with_course(mut self, course: Option<Course>) -> Self {
        self.course = course;
        self
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = Some(questions);
        self
    }
}

impl From<Test> for TestResponse {
    fn from(value: Test) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            duration: value.duration,
            course_id: value.course_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            course: None,
            questions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedTests {
    pub items: Vec<TestResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// One page worth of rows plus the unpaged total, as returned by the store.
#[derive(Debug, Clone, Default)]
pub struct TestPage {
    pub tests: Vec<Test>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: PER_PAGE,
        }
    }

    /// Saturates instead of overflowing, so an absurd page is just empty.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        ((total as f64) / (self.per_page as f64)).ceil() as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
