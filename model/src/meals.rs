use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{by_key, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// A planned meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meal {
    pub fn new(user_id: Uuid, date: NaiveDate, meal_type: MealType, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            meal_type,
            title: title.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for Meal {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for Meal {
    fn collection() -> &'static str { "meals" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { by_key(|m: &Meal| m.date) }
}
