use chrono::{DateTime, Utc};
use hearth_core::{by_key, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Collection;

/// An item of a trip's packing list. Categories are displayed in `category_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item: String,
    pub category: Option<String>,
    pub category_order: i32,
    pub checked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackingItem {
    pub fn new(user_id: Uuid, item: impl Into<String>, category: Option<String>, category_order: i32) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(), user_id, item: item.into(), category, category_order, checked: false, created_at: now, updated_at: now }
    }

    pub fn toggled(&self) -> Self { Self { checked: !self.checked, updated_at: Utc::now(), ..self.clone() } }
}

impl Record for PackingItem {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for PackingItem {
    fn collection() -> &'static str { "packing_items" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static {
        by_key(|p: &PackingItem| p.category_order).then(by_key(|p: &PackingItem| p.created_at))
    }
}

/// Assign each category its position in `categories` and return the items whose `category_order` changed,
/// ready for `LiveCollection::update_many`. Items of unlisted categories keep their order.
pub fn reorder_categories(items: &[PackingItem], categories: &[&str]) -> Vec<PackingItem> {
    items
        .iter()
        .filter_map(|item| {
            let position = categories.iter().position(|c| Some(*c) == item.category.as_deref())? as i32;
            (position != item.category_order).then(|| PackingItem { category_order: position, updated_at: Utc::now(), ..item.clone() })
        })
        .collect()
}
