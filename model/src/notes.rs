use chrono::{DateTime, Utc};
use hearth_core::{by_key, descending, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::Collection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Yellow,
    Blue,
    Green,
    Pink,
    Purple,
}

/// A shared sticky note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub color: NoteColor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(user_id: Uuid, text: impl Into<String>, color: NoteColor) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(), user_id, text: text.into(), color, created_at: now, updated_at: now }
    }
}

impl Record for Note {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for Note {
    fn collection() -> &'static str { "notes" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { descending(by_key(|n: &Note| n.created_at)) }
}
