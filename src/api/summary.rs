//! Branch summary endpoints: listing, refresh, manual override and revert

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{CurrentActor, JsonBody, QueryParams};
use crate::aggregation;
use crate::audit::{self, AuditEvent, SUMMARY_ENTITY};
use crate::error::{Error, Result};
use crate::models::{Actor, AggregateSummary, AuditAction, Role};
use crate::overrides;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    #[serde(default)]
    pub refresh: bool,
}

fn ensure_can_refresh(actor: &Actor) -> Result<()> {
    if actor.role == Role::Viewer {
        return Err(Error::Forbidden("viewers cannot refresh summaries".to_string()));
    }
    Ok(())
}

async fn refresh_and_audit(
    state: &AppState,
    branch_code: Option<&str>,
    actor: &Actor,
) -> Result<Vec<AggregateSummary>> {
    let store = state.store.as_ref();
    let refreshed = aggregation::refresh(store, branch_code).await?;
    audit::record(
        store,
        actor,
        AuditEvent::new(
            AuditAction::RefreshSummaries,
            SUMMARY_ENTITY,
            branch_code.unwrap_or("all"),
        )
        .details(json!({ "branches": refreshed.len() })),
    )
    .await;
    Ok(refreshed)
}

/// GET /api/summary[?refresh=true]
///
/// `refresh=true` follows the same role rule as `POST /api/summary/refresh`.
pub async fn get_summaries(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    QueryParams(params): QueryParams<SummaryParams>,
) -> Result<Json<Vec<AggregateSummary>>> {
    if params.refresh {
        ensure_can_refresh(&actor)?;
        refresh_and_audit(&state, None, &actor).await?;
    }
    let mut summaries = state.store.list_summaries().await?;
    summaries.retain(|summary| actor.can_access_branch(&summary.branch_code));
    Ok(Json(summaries))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub branch_code: Option<String>,
}

/// POST /api/summary/refresh
pub async fn refresh_summaries(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    request: Option<JsonBody<RefreshRequest>>,
) -> Result<Json<Vec<AggregateSummary>>> {
    ensure_can_refresh(&actor)?;
    let branch_code = request.and_then(|JsonBody(request)| request.branch_code);
    let refreshed = refresh_and_audit(&state, branch_code.as_deref(), &actor).await?;
    Ok(Json(refreshed))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub branch_code: String,
    pub field: String,
    pub value: f64,
}

/// POST /api/summary/update
pub async fn update_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<UpdateRequest>,
) -> Result<Json<AggregateSummary>> {
    let summary = overrides::update(
        state.store.as_ref(),
        &request.branch_code,
        &request.field,
        request.value,
        &actor,
    )
    .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct RevertRequest {
    pub branch_code: String,
    pub field: String,
}

/// POST /api/summary/revert
pub async fn revert_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<RevertRequest>,
) -> Result<Json<AggregateSummary>> {
    let summary = overrides::revert(
        state.store.as_ref(),
        &request.branch_code,
        &request.field,
        &actor,
    )
    .await?;
    Ok(Json(summary))
}
