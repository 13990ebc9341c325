//! Trend, insight and projection endpoints

use axum::{
    extract::State,
    Json,
};

use super::{CurrentActor, PathParams};
use crate::error::Result;
use crate::insights::{self, BranchAnalytics, Overview};
use crate::AppState;

/// GET /api/analytics
pub async fn get_analytics(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<Overview>> {
    Ok(Json(insights::overview(state.store.as_ref()).await?))
}

/// GET /api/analytics/branch/:branch_code
pub async fn get_branch_analytics(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    PathParams(branch_code): PathParams<String>,
) -> Result<Json<BranchAnalytics>> {
    let analytics = insights::for_branch(state.store.as_ref(), &branch_code).await?;
    Ok(Json(analytics))
}
