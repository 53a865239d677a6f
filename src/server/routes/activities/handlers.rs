use super::extract::{ActivityCreateBody, StudentEmail};
use crate::error::MergingtonError;
use crate::server::router::MergingtonState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use mergington_schema::{ActivityCreated, ActivityView, MessageResponse};
use tracing::debug;

/// GET /activities
pub(super) async fn list_activities_handler(
    State(state): State<MergingtonState>,
) -> Result<Json<Vec<ActivityView>>, MergingtonError> {
    let activities = state.db.list_activities().await?;
    debug!(count = activities.len(), "Listing activities");
    Ok(Json(activities.into_iter().map(ActivityView::from).collect()))
}

/// POST /activities
pub(super) async fn create_activity_handler(
    State(state): State<MergingtonState>,
    ActivityCreateBody(activity): ActivityCreateBody,
) -> Result<(StatusCode, Json<ActivityCreated>), MergingtonError> {
    let created = state.db.create_activity(activity).await?;
    Ok((StatusCode::CREATED, Json(ActivityCreated::new(created.name))))
}

/// POST /activities/{name}/signup?email=
pub(super) async fn signup_handler(
    State(state): State<MergingtonState>,
    Path(name): Path<String>,
    StudentEmail(email): StudentEmail,
) -> Result<Json<MessageResponse>, MergingtonError> {
    state.db.signup(name.clone(), email.clone()).await?;
    Ok(Json(MessageResponse::signed_up(&email, &name)))
}

/// DELETE /activities/{name}/unregister?email=
pub(super) async fn unregister_handler(
    State(state): State<MergingtonState>,
    Path(name): Path<String>,
    StudentEmail(email): StudentEmail,
) -> Result<Json<MessageResponse>, MergingtonError> {
    state.db.unregister(name.clone(), email.clone()).await?;
    Ok(Json(MessageResponse::unregistered(&email, &name)))
}
