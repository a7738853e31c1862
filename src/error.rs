use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::utils::validation::{field_messages, rule_error};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Please remove all questions in {name} before deleting")]
    QuestionsPresent { name: String },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request body: {0}")]
    Payload(#[from] JsonRejection),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::Validation(errors) => {
                let body = Json(json!({
                    "error": "The given data was invalid.",
                    "errors": field_messages(&errors),
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            Error::QuestionsPresent { name } => {
                // older clients read the refusal from `message`
                let text = format!("Please remove all questions in {} before deleting", name);
                let body = Json(json!({ "error": text, "message": text }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Payload(rejection) => (rejection.status(), rejection.body_text()),
            Error::Database(err) => {
                tracing::error!(error = ?err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected database error occurred".to_string(),
                )
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                // tests.name is the only unique column we write
                let mut errors = validator::ValidationErrors::new();
                errors.add("name", rule_error("unique"));
                Error::Validation(errors)
            }
            other => Error::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value as JsonValue;

    async fn render(err: Error) -> (StatusCode, JsonValue) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_render_field_map() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("name", rule_error("unique"));
        errors.add("course_id", rule_error("required"));

        let (status, body) = render(Error::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "The given data was invalid.");
        assert_eq!(body["errors"]["name"][0], "The name has already been taken.");
        assert_eq!(body["errors"]["course_id"][0], "The course id field is required.");
    }

    #[tokio::test]
    async fn questions_present_is_unprocessable_and_names_the_test() {
        let (status, body) = render(Error::QuestionsPresent {
            name: "Algebra I".into(),
        })
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"],
            "Please remove all questions in Algebra I before deleting"
        );
        assert_eq!(body["message"], body["error"]);
    }

    #[tokio::test]
    async fn status_codes_follow_variant() {
        let (status, _) = render(Error::NotFound("Test not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = render(Error::Forbidden("This action is unauthorized.".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "This action is unauthorized.");
        let (status, body) = render(Error::Internal("boom".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An unexpected error occurred");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
