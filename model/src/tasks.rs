use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{by_key, descending, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Collection;

/// A household task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: None,
            completed: false,
            assigned_to: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn assigned_to(mut self, person: impl Into<String>) -> Self {
        self.assigned_to = Some(person.into());
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn toggled(&self) -> Self { Self { completed: !self.completed, updated_at: Utc::now(), ..self.clone() } }
}

impl Record for Task {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for Task {
    fn collection() -> &'static str { "tasks" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { descending(by_key(|t: &Task| t.created_at)) }
}
