use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{by_key, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::Collection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TripKind {
    #[default]
    Voyage,
    Weekend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Idea,
    Planned,
    Booked,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: TripKind,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(user_id: Uuid, destination: impl Into<String>, start_date: NaiveDate, kind: TripKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            destination: destination.into(),
            start_date,
            end_date: None,
            kind,
            status: TripStatus::Idea,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Number of nights, when the end date is known
    pub fn nights(&self) -> Option<i64> { self.end_date.map(|end| (end - self.start_date).num_days()) }
}

impl Record for Trip {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for Trip {
    fn collection() -> &'static str { "trips" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { by_key(|t: &Trip| t.start_date) }
}
