pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::auth::require_bearer_auth, AppState};

/// The full application: `/health` is public, everything under `/api`
/// needs a bearer token.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/courses/:course_id/tests",
            get(test::list_course_tests),
        )
        .route("/api/tests", post(test::create_test))
        .route("/api/tests/search", get(test::search_tests))
        .route("/api/tests/batch-delete", post(test::batch_delete_tests))
        .route(
            "/api/tests/:id",
            get(test::get_test)
                .put(test::update_test)
                .patch(test::update_test)
                .delete(test::delete_test),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}
