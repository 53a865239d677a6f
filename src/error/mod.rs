mod mergington;

pub(crate) use mergington::is_unique_violation;
pub use mergington::{ApiErrorBody, ApiErrorObject, MergingtonError};
