use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use super::{CurrentActor, JsonBody};
use crate::directory::{self, NewAnnouncement};
use crate::error::Result;
use crate::models::Announcement;
use crate::AppState;

/// GET /api/announcements
pub async fn list_announcements(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<Vec<Announcement>>> {
    let today = Utc::now().date_naive();
    Ok(Json(directory::list_announcements(state.store.as_ref(), today).await?))
}

/// POST /api/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(new): JsonBody<NewAnnouncement>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let announcement = directory::create_announcement(state.store.as_ref(), new, &actor).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}
