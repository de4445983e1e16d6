//! Record types of the family organizer and the live collections that mirror them.
//!
//! Every collection is scoped to one user through a `user_id = <uuid>` filter and carries the ordering its view
//! displays. Opening one is a single call:
//!
//! ```ignore
//! let tasks = hearth_model::open::<Task>(backend, user_id, |update| render(&update.snapshot));
//! ```

use std::sync::Arc;

use hearth_core::{Backend, CollectionConfig, CollectionUpdate, Filter, LiveCollection, OrderingPolicy, Record};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use uuid::Uuid;

mod events;
mod family;
mod favorites;
mod films;
mod meals;
mod notes;
mod packing;
mod shopping;
mod tasks;
mod trips;

pub use events::{CalendarEvent, EventKind};
pub use family::{FamilyMember, Role};
pub use favorites::FavoriteMeal;
pub use films::{Film, FilmStatus};
pub use meals::{Meal, MealType};
pub use notes::{Note, NoteColor};
pub use packing::{reorder_categories, PackingItem};
pub use shopping::ShoppingItem;
pub use tasks::Task;
pub use trips::{Trip, TripKind, TripStatus};

/// A record type stored in a named backend table
pub trait Collection: Record<Id = Uuid> + Serialize + DeserializeOwned {
    /// Backend table name
    fn collection() -> &'static str;

    /// Display order of the collection
    fn ordering() -> impl OrderingPolicy<Self> + 'static;
}

/// The filter selecting one user's rows
pub fn scope(user_id: Uuid) -> Filter { Filter::all().eq("user_id", user_id.to_string()) }

/// Default configuration for `R` scoped to `user_id`
pub fn config<R: Collection>(user_id: Uuid) -> CollectionConfig { CollectionConfig::builder(R::collection()).filter(scope(user_id)).build() }

/// Start mirroring the rows of `R` owned by `user_id`
pub fn open<R: Collection>(
    backend: Arc<dyn Backend<R>>,
    user_id: Uuid,
    on_update: impl Fn(CollectionUpdate<R>) + Send + Sync + 'static,
) -> LiveCollection<R> {
    open_with(backend, config::<R>(user_id), on_update)
}

/// Start mirroring `R` with an explicit configuration (custom timeouts, additional filter clauses)
pub fn open_with<R: Collection>(
    backend: Arc<dyn Backend<R>>,
    config: CollectionConfig,
    on_update: impl Fn(CollectionUpdate<R>) + Send + Sync + 'static,
) -> LiveCollection<R> {
    debug!("Opening {} [{}]", R::collection(), config.filter);
    LiveCollection::start(backend, R::ordering(), config, on_update)
}
