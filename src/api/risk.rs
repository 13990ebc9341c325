use axum::{extract::State, Json};

use super::CurrentActor;
use crate::error::Result;
use crate::risk::{self, RiskBoard};
use crate::AppState;

/// GET /api/risk
pub async fn get_risk_board(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<RiskBoard>> {
    let summaries = state.store.list_summaries().await?;
    Ok(Json(risk::risk_board(&summaries)))
}
