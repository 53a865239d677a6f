use serde::{Deserialize, Serialize};

/// Body of `POST /activities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivityCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    /// Absent means unlimited capacity.
    #[serde(default)]
    pub max_participants: Option<i64>,
}

/// One element of the `GET /activities` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivityView {
    pub name: String,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub max_participants: Option<i64>,
    /// Registrant emails in signup order.
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivityCreated {
    pub message: String,
    pub name: String,
}

impl ActivityCreated {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            message: "Created".to_string(),
            name: name.into(),
        }
    }
}
