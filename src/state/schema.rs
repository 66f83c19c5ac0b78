//! The typed state schema shared by every collaborator of a chart.

use std::collections::HashMap;

use crate::types::{
    ChartItem, ContainerSize, GridId, GridResult, Period, RootHandle, Row, TimeLevel,
};

/// Minute resolution, e.g. `2024-01-31 09:15`.
pub const DEFAULT_CELL_ID_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Viewport metrics of the chart area.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub inner_height: f64,
}

/// Grid configuration. The pattern feeds cell ids, the class names are
/// handed to row renderers on every render.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// strftime pattern used for the time part of cell ids.
    pub cell_id_format: String,
    pub row_class: Option<String>,
    pub cell_class: Option<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_id_format: DEFAULT_CELL_ID_FORMAT.to_string(),
            row_class: None,
            cell_class: None,
        }
    }
}

/// What one grid instance has published.
#[derive(Debug, Clone, Default)]
pub struct PublishedGrid {
    pub rows: GridResult,
    pub container: ContainerSize,
    /// Bumped every time `rows` is replaced.
    pub revision: u64,
}

/// Everything the grids read and publish.
#[derive(Debug, Clone, Default)]
pub struct ChartState {
    pub viewport: Viewport,
    /// Vertical scroll offset. Unset until the user scrolls.
    pub scroll_top: Option<f64>,
    /// Active time level. Unset until the time scale has been computed.
    pub time_level: Option<TimeLevel>,
    /// Ordered ids of the rows that should be rendered.
    pub visible_rows: Vec<String>,
    /// Row registry.
    pub rows: HashMap<String, Row>,
    /// Sum of the outer heights of the visible rows.
    pub rows_height: f64,
    pub items: HashMap<String, ChartItem>,
    pub grid_config: GridConfig,

    // Published by the grids, one entry per live instance
    pub grids: HashMap<GridId, PublishedGrid>,
    pub handles: HashMap<GridId, RootHandle>,
}

impl ChartState {
    /// Periods of the active time level, empty if there is none.
    pub fn periods(&self) -> &[Period] {
        self.time_level
            .as_ref()
            .map(|level| level.periods.as_slice())
            .unwrap_or(&[])
    }

    /// Rows published by grid `id`, empty if it has published nothing.
    pub fn grid(&self, id: GridId) -> GridResult {
        self.grids
            .get(&id)
            .map(|published| published.rows.clone())
            .unwrap_or_default()
    }

    pub fn container(&self, id: GridId) -> ContainerSize {
        self.grids
            .get(&id)
            .map(|published| published.container)
            .unwrap_or_default()
    }

    /// Revision of grid `id`'s rows (0 before the first publish).
    pub fn grid_revision(&self, id: GridId) -> u64 {
        self.grids.get(&id).map_or(0, |published| published.revision)
    }
}
