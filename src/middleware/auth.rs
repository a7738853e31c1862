use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::AppState;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .map_or(false, |role| role.eq_ignore_ascii_case(ADMIN_ROLE))
    }
}

/// Rejects the request unless it carries a valid HS256 bearer token.
/// On success the decoded [`Claims`] are available as a request extension.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(code) => return unauthorized(code),
    };

    match decode_claims(token, &state.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(_) => unauthorized("invalid_token"),
    }
}

/// The `isAdmin` gate for destructive operations.
pub fn require_admin(claims: &Claims) -> Result<()> {
    if claims.is_admin() {
        Ok(())
    } else {
        tracing::warn!(sub = %claims.sub, "non-admin caller denied");
        Err(Error::Forbidden("This action is unauthorized.".to_string()))
    }
}

pub fn decode_claims(token: &str, secret: &str) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

fn bearer_token(headers: &HeaderMap) -> std::result::Result<&str, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing_authorization")?;
    let auth_str = auth_header.to_str().map_err(|_| "bad_authorization")?;
    auth_str.strip_prefix("Bearer ").ok_or("unsupported_scheme")
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}
