use crate::server::router::MergingtonState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub mod extract;
pub mod handlers;

pub fn router() -> Router<MergingtonState> {
    Router::new()
        .route(
            "/activities",
            get(handlers::list_activities_handler).post(handlers::create_activity_handler),
        )
        .route("/activities/{name}/signup", post(handlers::signup_handler))
        .route(
            "/activities/{name}/unregister",
            delete(handlers::unregister_handler),
        )
}
