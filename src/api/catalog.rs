//! Branch and week catalog

use axum::{extract::State, Json};

use super::CurrentActor;
use crate::directory;
use crate::error::Result;
use crate::models::{Branch, Week};
use crate::AppState;

/// GET /api/branches
pub async fn list_branches(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<Vec<Branch>>> {
    Ok(Json(directory::list_branches(state.store.as_ref()).await?))
}

/// GET /api/weeks
pub async fn list_weeks(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<Vec<Week>>> {
    Ok(Json(directory::list_weeks(state.store.as_ref()).await?))
}
