use crate::db::NewActivity;
use crate::error::MergingtonError;
use crate::utils::logging::debug_json;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
};
use mergington_schema::{ActivityCreate, EmailParams};
use tracing::debug;

impl From<JsonRejection> for MergingtonError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected activity body");
        MergingtonError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for MergingtonError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected query string");
        MergingtonError::InvalidRequest(rejection.body_text())
    }
}

/// Validated body of `POST /activities`.
pub(crate) struct ActivityCreateBody(pub(crate) NewActivity);

impl<S> FromRequest<S> for ActivityCreateBody
where
    S: Send + Sync,
{
    type Rejection = MergingtonError;

    /// JSON errors become `INVALID_REQUEST`; so do an empty `name` and a
    /// negative `max_participants`.
    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<ActivityCreate>::from_request(req, &()).await?;
        debug_json("Incoming activity create request", &body);
        validate_activity(body).map(Self)
    }
}

pub(crate) fn validate_activity(body: ActivityCreate) -> Result<NewActivity, MergingtonError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(MergingtonError::InvalidRequest(
            "name must not be empty".to_string(),
        ));
    }
    if body.max_participants.is_some_and(|max| max < 0) {
        return Err(MergingtonError::InvalidRequest(
            "max_participants must not be negative".to_string(),
        ));
    }
    Ok(NewActivity {
        name: name.to_string(),
        description: body.description,
        schedule: body.schedule,
        max_participants: body.max_participants,
    })
}

/// The `email` query parameter of signup and unregister, trimmed and non-empty.
pub(crate) struct StudentEmail(pub(crate) String);

impl<S> FromRequestParts<S> for StudentEmail
where
    S: Send + Sync,
{
    type Rejection = MergingtonError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<EmailParams>::from_request_parts(parts, state).await?;
        validate_email(&params.email).map(Self)
    }
}

/// Query decoding is lossy, so invalid UTF-8 shows up as U+FFFD and is refused.
pub(crate) fn validate_email(raw: &str) -> Result<String, MergingtonError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(MergingtonError::InvalidRequest(
            "email must not be empty".to_string(),
        ));
    }
    if email.contains(char::REPLACEMENT_CHARACTER) {
        return Err(MergingtonError::InvalidRequest(
            "email must be valid UTF-8".to_string(),
        ));
    }
    Ok(email.to_string())
}
