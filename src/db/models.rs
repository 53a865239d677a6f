use chrono::{DateTime, Utc};
use mergington_schema::ActivityView;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbActivity {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub max_participants: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRegistration {
    pub id: i64,
    pub email: String,
    pub activity_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Validated input for inserting an activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewActivity {
    pub name: String,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub max_participants: Option<i64>,
}

/// An activity joined with its registrant emails, oldest signup first.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityWithParticipants {
    pub activity: DbActivity,
    pub participants: Vec<String>,
}

impl From<ActivityWithParticipants> for ActivityView {
    fn from(value: ActivityWithParticipants) -> Self {
        let ActivityWithParticipants {
            activity,
            participants,
        } = value;
        ActivityView {
            name: activity.name,
            description: activity.description,
            schedule: activity.schedule,
            max_participants: activity.max_participants,
            participants,
        }
    }
}
