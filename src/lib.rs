//! # spark-timeline
//!
//! Virtualized grid core for timeline and schedule charts.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained row updates.
//!
//! ## Architecture
//!
//! Given the visible rows and the periods of the active time level, the
//! grid produces an ordered row x period matrix of cells, then reconciles a
//! set of stateful row renderers against it so unchanged rows are reused
//! instead of rebuilt.
//!
//! ```text
//! StateStore → CellMatrixBuilder → published grid → RowReconciler → render request
//! ```
//!
//! Everything runs synchronously on the turn that commits a state change.
//! Several changes in one transaction cost one rebuild.
//!
//! ## Modules
//!
//! - [`types`] - Core types (Period, Row, Cell, RowWithCells, GridResult)
//! - [`state`] - Typed chart state, state paths, transactional store
//! - [`engine`] - Cell matrix builder, format cache, cell hooks
//! - [`renderer`] - Keyed row renderer reconciliation, render scheduling
//! - [`pipeline`] - Lifecycle binder and the wired `ChartGrid`
//! - [`error`] - Composition errors

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{GridError, Result};

pub use engine::{
    CellHook, CellMatrixBuilder, ChronoFormatter, FormatCache, GridInputs, HookPipeline,
    TimeFormatter, build_grid, container_size,
};

pub use renderer::{
    KeyBy, ReconcileStats, RenderRequests, RendererFactory, RowEntry, RowKey, RowReconciler,
    RowRenderer,
};

pub use pipeline::{ChartGrid, ChartGridBuilder, LifecycleBinder};

pub use state::{
    ChartState, Commit, DEFAULT_CELL_ID_FORMAT, GridConfig, PublishedGrid, StatePaths,
    StateStore, SubscribeMode, Subscription, Transaction, Viewport,
};
