use chrono::{DateTime, Utc};
use hearth_core::{by_key, descending, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Collection;

/// An entry of the shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub checked: bool,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingItem {
    pub fn new(user_id: Uuid, name: impl Into<String>, category: Option<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(), user_id, name: name.into(), checked: false, category, created_at: now, updated_at: now }
    }

    /// The same item with its checkbox flipped
    pub fn toggled(&self) -> Self { Self { checked: !self.checked, updated_at: Utc::now(), ..self.clone() } }
}

impl Record for ShoppingItem {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for ShoppingItem {
    fn collection() -> &'static str { "shopping_items" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { descending(by_key(|i: &ShoppingItem| i.created_at)) }
}
