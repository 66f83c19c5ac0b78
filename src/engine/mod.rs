//! Grid Engine - builds the row x period cell matrix.
//!
//! - Cell Matrix: ordered rows, prefix-sum offsets, one cell per period
//! - Format Cache: period labels memoized by raw timestamp
//! - Hooks: ordered per-cell transforms applied as cells are created
//!
//! # Data Flow
//!
//! ```text
//! StateStore (viewport, periods, visible rows, registry)
//!     → CellMatrixBuilder::rebuild → build_grid → HookPipeline per cell
//!     → StateStore (grid, container)
//! ```

mod cell_matrix;
mod format_cache;
mod hooks;

pub use cell_matrix::{CellMatrixBuilder, GridInputs, build_grid, container_size, publish};
pub use format_cache::{ChronoFormatter, FormatCache, TimeFormatter};
pub use hooks::{CellHook, HookPipeline};
