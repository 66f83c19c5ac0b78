//! State Module - Shared chart state
//!
//! - **Schema** - `ChartState`, the typed state every collaborator reads
//! - **Paths** - `StatePaths`, the observable locations in that schema
//! - **Store** - transactions, epochs, bulk and per-path subscriptions

mod paths;
mod schema;
mod store;

pub use paths::StatePaths;
pub use schema::{ChartState, DEFAULT_CELL_ID_FORMAT, GridConfig, PublishedGrid, Viewport};
pub use store::{Commit, StateStore, SubscribeMode, Subscription, Transaction};
