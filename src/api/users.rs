use axum::{
    extract::State,
    Json,
};
use uuid::Uuid;

use super::{CurrentActor, JsonBody, PathParams};
use crate::directory::{self, UserUpdate};
use crate::error::Result;
use crate::models::User;
use crate::AppState;

/// GET /api/users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<User>>> {
    Ok(Json(directory::list_users(state.store.as_ref(), &actor).await?))
}

/// PATCH /api/users/:id (admin)
pub async fn update_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    PathParams(id): PathParams<Uuid>,
    JsonBody(update): JsonBody<UserUpdate>,
) -> Result<Json<User>> {
    let user = directory::update_user(state.store.as_ref(), id, update, &actor).await?;
    Ok(Json(user))
}
