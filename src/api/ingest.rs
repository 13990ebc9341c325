use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;

use super::{CurrentActor, QueryParams};
use crate::error::Result;
use crate::ingest;
use crate::models::IngestionLog;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct IngestParams {
    pub filename: Option<String>,
}

/// POST /api/ingest?filename=
///
/// Body is the CSV text. Row problems land in the returned log's anomalies.
pub async fn ingest_sheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    QueryParams(params): QueryParams<IngestParams>,
    body: String,
) -> Result<Json<IngestionLog>> {
    let filename = params.filename.unwrap_or_else(|| "upload.csv".to_string());
    let log = ingest::ingest(state.store.as_ref(), &filename, body.as_bytes(), &actor).await?;
    Ok(Json(log))
}
