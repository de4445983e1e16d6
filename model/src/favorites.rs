use chrono::{DateTime, Utc};
use hearth_core::{by_key, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Collection;

/// A meal the family likes to cook again, offered when planning the week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMeal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FavoriteMeal {
    pub fn new(user_id: Uuid, name: impl Into<String>, category: Option<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(), user_id, name: name.into(), category, description: None, created_at: now, updated_at: now }
    }
}

impl Record for FavoriteMeal {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for FavoriteMeal {
    fn collection() -> &'static str { "favorite_meals" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { by_key(|m: &FavoriteMeal| m.name.to_lowercase()) }
}
