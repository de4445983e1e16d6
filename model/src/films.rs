use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{by_key, descending, OrderingPolicy, Record};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::Collection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum FilmStatus {
    #[default]
    #[serde(rename = "a-voir")]
    #[strum(serialize = "a-voir")]
    ToWatch,
    #[serde(rename = "en-cours")]
    #[strum(serialize = "en-cours")]
    Watching,
    #[serde(rename = "vu")]
    #[strum(serialize = "vu")]
    Watched,
}

/// A film on the family watch list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "titre")]
    pub title: String,
    pub genre: Option<String>,
    #[serde(rename = "annee")]
    pub year: Option<i32>,
    /// Runtime in minutes
    #[serde(rename = "duree")]
    pub duration: Option<u32>,
    #[serde(rename = "note")]
    pub rating: Option<u8>,
    #[serde(rename = "statut")]
    pub status: FilmStatus,
    #[serde(rename = "date_vue")]
    pub watched_on: Option<NaiveDate>,
    #[serde(rename = "commentaire")]
    pub comment: Option<String>,
    pub poster: Option<String>,
    pub tmdb_id: Option<i64>,
    pub overview: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Film {
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            genre: None,
            year: None,
            duration: None,
            rating: None,
            status: FilmStatus::ToWatch,
            watched_on: None,
            comment: None,
            poster: None,
            tmdb_id: None,
            overview: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark as seen on `date` with an optional rating
    pub fn watched(&self, date: NaiveDate, rating: Option<u8>) -> Self {
        Self { status: FilmStatus::Watched, watched_on: Some(date), rating, updated_at: Utc::now(), ..self.clone() }
    }
}

impl Record for Film {
    type Id = Uuid;
    fn id(&self) -> Uuid { self.id }
}

impl Collection for Film {
    fn collection() -> &'static str { "films" }

    fn ordering() -> impl OrderingPolicy<Self> + 'static { descending(by_key(|f: &Film| f.created_at)) }
}
