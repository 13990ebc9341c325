//! Edit history endpoint

use axum::{
    extract::State,
    Json,
};

use super::{CurrentActor, PathParams};
use crate::audit::{self, HistoryItem};
use crate::error::Result;
use crate::AppState;

/// GET /api/audit/:branch_code
///
/// Newest first, at most fifty entries.
pub async fn get_audit_history(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    PathParams(branch_code): PathParams<String>,
) -> Result<Json<Vec<HistoryItem>>> {
    let history = audit::summary_history(state.store.as_ref(), &branch_code).await?;
    Ok(Json(history))
}
