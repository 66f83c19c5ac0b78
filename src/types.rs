//! Core types for spark-timeline.
//!
//! These types flow from the state store through the cell matrix builder
//! and into the row reconciler. They are plain data: cheap to clone,
//! comparable, and free of any rendering concerns.

use std::fmt;
use std::rc::Rc;

// =============================================================================
// Time axis
// =============================================================================

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// One column boundary of the active time level.
///
/// Periods are supplied in ascending `left_global` order by whatever
/// computes the time scale. The grid never reorders them.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    /// Left edge of the period.
    pub left_global: Timestamp,
    /// Right edge of the period (exclusive).
    pub right_global: Timestamp,
    /// Rendered width in pixels.
    pub width: f64,
}

impl Period {
    pub fn new(left_global: Timestamp, right_global: Timestamp, width: f64) -> Self {
        Self {
            left_global,
            right_global,
            width,
        }
    }
}

/// The active time level: the list of periods the grid is laid out against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeLevel {
    pub periods: Vec<Period>,
}

// =============================================================================
// Rows
// =============================================================================

/// Derived layout data for a row.
///
/// Computed elsewhere (row heights depend on item stacking). A row without
/// it has not been laid out yet and is not part of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RowData {
    /// Height including padding - what the next row is offset by.
    pub outer_height: f64,
    /// Height of the content area.
    pub inner_height: f64,
}

/// A row of the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub label: String,
    /// `None` until the row has been laid out.
    pub data: Option<RowData>,
}

impl Row {
    /// A row that has been laid out with the given outer height.
    pub fn new(id: impl Into<String>, outer_height: f64) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            data: Some(RowData {
                outer_height,
                inner_height: outer_height,
            }),
        }
    }

    /// A row that has no layout data yet.
    pub fn pending(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            data: None,
        }
    }

    /// Outer height, if the row has been laid out.
    #[inline]
    pub fn outer_height(&self) -> Option<f64> {
        self.data.map(|d| d.outer_height)
    }
}

// =============================================================================
// Chart items
// =============================================================================

/// Time extent of a chart item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemTime {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// A chart item (task/bar) assigned to a row.
///
/// The grid does not draw items; moving one between rows or changing its
/// time extent still changes what the grid cells represent, so the grid
/// rebuilds on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartItem {
    pub id: String,
    pub row_id: String,
    pub time: ItemTime,
}

// =============================================================================
// Grid
// =============================================================================

/// One grid cell: the intersection of a row and a period.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// `"{row id}:{formatted period start}"` - unique within a build and
    /// stable across rebuilds for the same row and instant.
    pub id: String,
    pub time: Period,
    pub row: Rc<Row>,
    /// Vertical offset of the owning row.
    pub top: f64,
}

/// A row together with its cells, in period order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowWithCells {
    pub row: Rc<Row>,
    pub cells: Vec<Cell>,
    pub top: f64,
    pub width: f64,
}

/// The full ordered row x period matrix.
///
/// Always published as a whole. Entries are `Rc` so that identity keying
/// can tell a rebuilt entry from a re-published one.
pub type GridResult = Vec<Rc<RowWithCells>>;

/// Sizing for the frame that encloses the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

// =============================================================================
// Grid instances
// =============================================================================

/// Identifies one grid instance within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(pub u64);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid-{}", self.0)
    }
}

/// Handle to a grid's root element, as seen by other collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootHandle(pub String);

impl RootHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
