//! Mitigation task endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{CurrentActor, JsonBody, PathParams, QueryParams};
use crate::directory::{self, MitigationUpdate, NewMitigation};
use crate::error::Result;
use crate::models::{MitigationFilter, MitigationTask};
use crate::AppState;

/// GET /api/mitigation[?branch_code=&status=]
pub async fn list_mitigations(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    QueryParams(filter): QueryParams<MitigationFilter>,
) -> Result<Json<Vec<MitigationTask>>> {
    Ok(Json(directory::list_mitigations(state.store.as_ref(), &filter).await?))
}

/// POST /api/mitigation
pub async fn create_mitigation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(new): JsonBody<NewMitigation>,
) -> Result<(StatusCode, Json<MitigationTask>)> {
    let task = directory::create_mitigation(state.store.as_ref(), new, &actor).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/mitigation/:id
pub async fn update_mitigation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    PathParams(id): PathParams<Uuid>,
    JsonBody(update): JsonBody<MitigationUpdate>,
) -> Result<Json<MitigationTask>> {
    let task = directory::update_mitigation(state.store.as_ref(), id, update, &actor).await?;
    Ok(Json(task))
}
