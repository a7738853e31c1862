//! Storage for tests and the two relations they touch.
//!
//! Everything the handlers need from the database goes through [`TestStore`],
//! with one explicit query per foreign-key relation instead of lazy loading.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::dto::test_dto::{PageRequest, TestFields, TestPage};
use crate::error::Result;
use crate::models::{course::Course, question::Question, test::Test};

const TEST_COLUMNS: &str = "id, name, description, duration, course_id, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestStore: Send + Sync {
    async fn course_exists(&self, course_id: i64) -> Result<bool>;

    async fn courses_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Course>>;

    async fn find_test(&self, id: i64) -> Result<Option<Test>>;

    /// Whether another test already uses `name`. `except_id` is left out of
    /// the check so a test can keep its own name on update.
    async fn name_taken(&self, name: String, except_id: Option<i64>) -> Result<bool>;

    async fn insert_test(&self, fields: TestFields) -> Result<Test>;

    async fn update_test(&self, id: i64, fields: TestFields) -> Result<Test>;

    async fn delete_test(&self, id: i64) -> Result<bool>;

    async fn count_questions(&self, test_id: i64) -> Result<i64>;

    async fn questions_for_tests(&self, test_ids: Vec<i64>) -> Result<Vec<Question>>;

    async fn list_tests_by_course(&self, course_id: i64, page: PageRequest) -> Result<TestPage>;

    /// Case-insensitive substring match on name or description; all tests
    /// when `term` is `None`.
    async fn search_tests(&self, term: Option<String>, page: PageRequest) -> Result<TestPage>;
}

#[derive(Clone)]
pub struct PgTestStore {
    pool: PgPool,
}

impl PgTestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TestStore for PgTestStore {
    async fn course_exists(&self, course_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn courses_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Course>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, name, description, image, created_at, updated_at
            FROM courses
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn find_test(&self, id: i64) -> Result<Option<Test>> {
        let test = sqlx::query_as::<_, Test>(&format!(
            "SELECT {} FROM tests WHERE id = $1",
            TEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(test)
    }

    async fn name_taken(&self, name: String, except_id: Option<i64>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tests
                WHERE name = $1
                  AND ($2::bigint IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_test(&self, fields: TestFields) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(&format!(
            r#"
            INSERT INTO tests (name, description, duration, course_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TEST_COLUMNS
        ))
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.duration)
        .bind(fields.course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(test)
    }

    async fn update_test(&self, id: i64, fields: TestFields) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(&format!(
            r#"
            UPDATE tests
            SET
                name = $2,
                description = $3,
                duration = $4,
                course_id = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TEST_COLUMNS
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.duration)
        .bind(fields.course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(test)
    }

    async fn delete_test(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_questions(&self, test_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE test_id = $1")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn questions_for_tests(&self, test_ids: Vec<i64>) -> Result<Vec<Question>> {
        if test_ids.is_empty() {
            return Ok(Vec::new());
        }
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, test_id, question, created_at, updated_at
            FROM questions
            WHERE test_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(test_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn list_tests_by_course(&self, course_id: i64, page: PageRequest) -> Result<TestPage> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tests WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;

        let tests = sqlx::query_as::<_, Test>(&format!(
            r#"
            SELECT {}
            FROM tests
            WHERE course_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
            TEST_COLUMNS
        ))
        .bind(course_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(TestPage { tests, total })
    }

    async fn search_tests(&self, term: Option<String>, page: PageRequest) -> Result<TestPage> {
        let pattern = term.map(|t| format!("%{}%", escape_like(&t)));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tests
            WHERE ($1::text IS NULL OR (name ILIKE $1 OR description ILIKE $1))
            "#,
        )
        .bind(pattern.clone())
        .fetch_one(&self.pool)
        .await?;

        let tests = sqlx::query_as::<_, Test>(&format!(
            r#"
            SELECT {}
            FROM tests
            WHERE ($1::text IS NULL OR (name ILIKE $1 OR description ILIKE $1))
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
            TEST_COLUMNS
        ))
        .bind(pattern)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(TestPage { tests, total })
    }
}

/// Escapes LIKE wildcards so the term matches literally. Postgres uses `\`
/// as the default escape character.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
