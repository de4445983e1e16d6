//! # Hearth
//!
//! Client-side collections for a family organizer, mirrored from a hosted backend and kept consistent with its
//! realtime change feed while the user edits optimistically.
//!
//! ## Core Concepts
//!
//! - **Record**: a row with a stable identity key
//! - **LiveCollection**: the ordered local mirror of one scoped collection, owning its change feed subscription
//! - **Backend**: anything offering fetch / mutate / subscribe; injected into every collection
//! - **Pending write**: an optimistic local change not yet confirmed by the backend. Remote events for it are
//!   recognised as echoes instead of being applied twice
//!
//! ## Example
//!
//! ```rust
//! # use hearth::{model::{self, ShoppingItem}, memory::MemoryBackend};
//! # use std::sync::Arc;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(MemoryBackend::<ShoppingItem>::new());
//!     let user = uuid::Uuid::new_v4();
//!
//!     let list = model::open::<ShoppingItem>(backend.clone(), user, |update| {
//!         println!("{} items ({:?})", update.snapshot.len(), update.cause);
//!     });
//!     list.wait_ready().await?;
//!
//!     list.insert(ShoppingItem::new(user, "milk", None)).await?;
//!     assert_eq!(list.snapshot().len(), 1);
//!
//!     list.shutdown().await;
//!     Ok(())
//! # }
//! ```

pub use hearth_core::*;
pub use hearth_model as model;

#[cfg(feature = "memory")]
pub use hearth_connector_memory as memory;
