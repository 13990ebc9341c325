//! Weekly report endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{CurrentActor, JsonBody, PathParams, QueryParams};
use crate::error::Result;
use crate::models::{ReportFilter, ReportInput, WeeklyReport};
use crate::reports::{self, BulkOutcome};
use crate::AppState;

/// GET /api/reports?branch_code=&week_no=&status=
pub async fn list_reports(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    QueryParams(filter): QueryParams<ReportFilter>,
) -> Result<Json<Vec<WeeklyReport>>> {
    let reports = reports::list_reports(state.store.as_ref(), filter, &actor).await?;
    Ok(Json(reports))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveParams {
    /// Fail with 409 instead of updating an existing week.
    #[serde(default)]
    pub create_only: bool,
}

/// POST /api/reports[?create_only=true]
///
/// Creates or updates the report for its branch and week; 201 when created.
pub async fn save_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    QueryParams(params): QueryParams<SaveParams>,
    JsonBody(input): JsonBody<ReportInput>,
) -> Result<(StatusCode, Json<WeeklyReport>)> {
    let store = state.store.as_ref();
    if params.create_only {
        let report = reports::create_report(store, &input, &actor).await?;
        return Ok((StatusCode::CREATED, Json(report)));
    }

    let saved = reports::save_report(store, &input, &actor).await?;
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved.report)))
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub reports: Vec<ReportInput>,
}

/// POST /api/reports/bulk
pub async fn bulk_save_reports(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<BulkRequest>,
) -> Result<Json<BulkOutcome>> {
    let outcome = reports::bulk_save(state.store.as_ref(), &request.reports, &actor).await?;
    Ok(Json(outcome))
}

/// POST /api/reports/:branch_code/:week_no/reopen
pub async fn reopen_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    PathParams((branch_code, week_no)): PathParams<(String, i32)>,
) -> Result<Json<WeeklyReport>> {
    let report =
        reports::reopen_report(state.store.as_ref(), &branch_code, week_no, &actor).await?;
    Ok(Json(report))
}
