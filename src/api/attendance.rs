//! Daily attendance sheet endpoints

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;

use super::{CurrentActor, JsonBody, QueryParams};
use crate::attendance::{self, BranchSheet};
use crate::error::Result;
use crate::models::AttendanceRecord;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecordParams {
    pub week_no: Option<i32>,
}

/// GET /api/crt/records[?week_no=]
pub async fn list_attendance(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    QueryParams(params): QueryParams<RecordParams>,
) -> Result<Json<Vec<AttendanceRecord>>> {
    let records = state.store.list_attendance_records(params.week_no).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct SaveSheetsRequest {
    pub week_no: i32,
    pub branches: Vec<BranchSheet>,
}

/// POST /api/crt/records
pub async fn save_attendance(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<SaveSheetsRequest>,
) -> Result<Json<Vec<AttendanceRecord>>> {
    let records = attendance::save_sheets(
        state.store.as_ref(),
        request.week_no,
        &request.branches,
        &actor,
    )
    .await?;
    Ok(Json(records))
}
