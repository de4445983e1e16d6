use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{by_key, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::Collection;

/// Variant order is display order: parents first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Papa,
    Maman,
    Enfant,
    #[default]
    Autre,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub color: String,
    pub allergies: Option<String>,
    pub dietary_preferences: Option<String>,
    pub whatsapp_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FamilyMember {
    pub fn new(user_id: Uuid, first_name: impl Into<String>, last_name: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            birth_date: None,
            email: None,
            phone: None,
            avatar_url: None,
            color: "#3b82f6".to_string(),
            allergies: None,
            dietary_preferences: None,
            whatsapp_notifications: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Empty optional text fields are stored as null
    pub fn normalized(mut self) -> Self {
        for field in [&mut self.email, &mut self.phone, &mut self.allergies, &mut self.dietary_preferences] {
            if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }
}

impl Record for FamilyMember {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for FamilyMember {
    fn collection() -> &'static str { "family_members" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { by_key(|m: &FamilyMember| m.role) }
}
