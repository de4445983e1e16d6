use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use hearth_core::{by_key, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::Collection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum EventKind {
    /// An appointment
    #[serde(rename = "rdv")]
    #[strum(serialize = "rdv")]
    Appointment,
    #[serde(rename = "anniversaire")]
    #[strum(serialize = "anniversaire")]
    Birthday,
    #[default]
    #[serde(rename = "autre")]
    #[strum(serialize = "autre")]
    Other,
}

/// An entry of the family calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub person: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn new(user_id: Uuid, title: impl Into<String>, date: NaiveDate, kind: EventKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            date,
            time: None,
            kind,
            person: None,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn at(mut self, time: NaiveTime) -> Self {
        self.time = Some(time);
        self
    }
}

impl Record for CalendarEvent {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for CalendarEvent {
    fn collection() -> &'static str { "events" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { by_key(|e: &CalendarEvent| e.date) }
}
