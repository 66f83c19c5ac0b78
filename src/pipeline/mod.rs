//! Grid Pipeline
//!
//! Wires the grid engine and the row reconciler to the state store.
//!
//! # Pipeline Architecture
//!
//! ```text
//! state change → CellMatrixBuilder (rebuild) → published grid → RowReconciler → render request
//! ```
//!
//! ## Key Design Principles
//!
//! - **One rebuild per transaction**: the builder subscribes in bulk mode
//! - **Whole replacement**: the grid is published as a unit, never patched
//! - **Instance-scoped state**: caches and renderers live in the `ChartGrid`
//! - **Synchronous teardown**: `destroy()` releases everything before returning

mod chart_grid;
mod lifecycle;

pub use chart_grid::{ChartGrid, ChartGridBuilder};
pub use lifecycle::LifecycleBinder;
