pub mod activity;
pub mod registration;

pub use activity::{ActivityCreate, ActivityCreated, ActivityView};
pub use registration::{EmailParams, MessageResponse};
