use std::collections::HashMap;
use std::sync::Arc;

use validator::{Validate, ValidationErrors};

use crate::database::test_store::TestStore;
use crate::dto::test_dto::{
    PageRequest, PaginatedTests, TestFields, TestPage, TestPayload, TestResponse,
};
use crate::error::{Error, Result};
use crate::models::test::Test;
use crate::utils::validation::rule_error;

/// Which relations to attach to every test on a page.
#[derive(Debug, Clone, Copy)]
enum Relations {
    Course,
    CourseAndQuestions,
}

#[derive(Clone)]
pub struct TestService {
    store: Arc<dyn TestStore>,
}

impl TestService {
    pub fn new(store: Arc<dyn TestStore>) -> Self {
        Self { store }
    }

    pub async fn list_by_course(&self, course_id: i64, page: PageRequest) -> Result<PaginatedTests> {
        let result = self.store.list_tests_by_course(course_id, page).await?;
        self.paginate(result, page, Relations::CourseAndQuestions)
            .await
    }

    pub async fn create(&self, payload: TestPayload) -> Result<Test> {
        let fields = self.validated(payload, None).await?;
        let test = self.store.insert_test(fields).await?;
        tracing::info!(test_id = test.id, course_id = test.course_id, "test created");
        Ok(test)
    }

    pub async fn get(&self, id: i64) -> Result<TestResponse> {
        let test = self.find_or_fail(id).await?;
        let mut attached = self
            .attach(vec![test], Relations::CourseAndQuestions)
            .await?;
        attached
            .pop()
            .ok_or_else(|| Error::Internal("attached page lost its test".to_string()))
    }

    pub async fn update(&self, id: i64, payload: TestPayload) -> Result<Test> {
        let existing = self.find_or_fail(id).await?;
        let fields = self.validated(payload, Some(existing.id)).await?;
        let test = self.store.update_test(existing.id, fields).await?;
        tracing::info!(test_id = test.id, "test updated");
        Ok(test)
    }

    /// Deletes a test unless it still has questions.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let test = self.find_or_fail(id).await?;
        self.ensure_no_questions(&test).await?;
        self.remove(&test).await
    }

    /// Deletes every id in `ids`, in order. Each test is loaded and checked
    /// before anything is removed, so a missing id or a test that still has
    /// questions leaves the whole batch untouched.
    pub async fn delete_many(&self, ids: &[i64]) -> Result<()> {
        let mut batch = Vec::with_capacity(ids.len());
        for &id in ids {
            let test = self.find_or_fail(id).await?;
            self.ensure_no_questions(&test).await?;
            batch.push(test);
        }

        for test in &batch {
            self.remove(test).await?;
        }
        tracing::info!(count = batch.len(), "test batch deleted");
        Ok(())
    }

    pub async fn search(&self, term: Option<&str>, page: PageRequest) -> Result<PaginatedTests> {
        let result = self
            .store
            .search_tests(term.map(str::to_string), page)
            .await?;
        self.paginate(result, page, Relations::Course).await
    }

    async fn find_or_fail(&self, id: i64) -> Result<Test> {
        self.store
            .find_test(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", id)))
    }

    async fn ensure_no_questions(&self, test: &Test) -> Result<()> {
        let questions = self.store.count_questions(test.id).await?;
        if questions > 0 {
            tracing::warn!(test_id = test.id, questions, "delete blocked by questions");
            return Err(Error::QuestionsPresent {
                name: test.name.clone(),
            });
        }
        Ok(())
    }

    async fn remove(&self, test: &Test) -> Result<()> {
        if !self.store.delete_test(test.id).await? {
            return Err(Error::NotFound(format!("Test {} not found", test.id)));
        }
        tracing::info!(test_id = test.id, "test deleted");
        Ok(())
    }

    /// Runs the field rules, then the rules that need the database: name
    /// uniqueness (ignoring `except_id`) and course existence. All failures
    /// are reported together.
    async fn validated(&self, payload: TestPayload, except_id: Option<i64>) -> Result<TestFields> {
        let mut errors = match payload.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        let (name_ok, course_ok) = {
            let failed = errors.field_errors();
            (!failed.contains_key("name"), !failed.contains_key("course_id"))
        };

        if let (true, Some(name)) = (name_ok, payload.name.as_ref()) {
            if self.store.name_taken(name.clone(), except_id).await? {
                errors.add("name", rule_error("unique"));
            }
        }
        if let (true, Some(course_id)) = (course_ok, payload.course_id) {
            if !self.store.course_exists(course_id).await? {
                errors.add("course_id", rule_error("exists"));
            }
        }

        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }
        payload
            .into_fields()
            .ok_or_else(|| Error::Internal("validated payload missing a field".to_string()))
    }

    async fn paginate(
        &self,
        result: TestPage,
        page: PageRequest,
        relations: Relations,
    ) -> Result<PaginatedTests> {
        let items = self.attach(result.tests, relations).await?;
        Ok(PaginatedTests {
            items,
            total: result.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages(result.total),
        })
    }

    async fn attach(&self, tests: Vec<Test>, relations: Relations) -> Result<Vec<TestResponse>> {
        let mut course_ids: Vec<i64> = tests.iter().map(|t| t.course_id).collect();
        course_ids.sort_unstable();
        course_ids.dedup();
        let courses: HashMap<i64, _> = self
            .store
            .courses_by_ids(course_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut questions: HashMap<i64, Vec<_>> = HashMap::new();
        if let Relations::CourseAndQuestions = relations {
            let test_ids = tests.iter().map(|t| t.id).collect();
            for question in self.store.questions_for_tests(test_ids).await? {
                questions.entry(question.test_id).or_default().push(question);
            }
        }

        Ok(tests
            .into_iter()
            .map(|test| {
                let course = courses.get(&test.course_id).cloned();
                let test_id = test.id;
                let response = TestResponse::from(test).with_course(course);
                match relations {
                    Relations::Course => response,
                    Relations::CourseAndQuestions => {
                        response.with_questions(questions.remove(&test_id).unwrap_or_default())
                    }
                }
            })
            .collect())
    }
}
