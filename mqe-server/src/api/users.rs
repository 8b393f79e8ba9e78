//! User registration endpoints

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::models::{NewUser, User};
use crate::AppState;

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.engine.create_user(&request.username).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.engine.list_users().await?))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/api/users", get(list_users).post(create_user))
}
