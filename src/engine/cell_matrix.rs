//! Cell Matrix Builder - visible rows x periods.
//!
//! Builds the grid whenever one of [`CellMatrixBuilder::DEPENDENCIES`]
//! changes:
//! - Viewport width or inner height
//! - The active time level's periods
//! - Visible row ids (order or membership), their heights, their total height
//! - Row assignment or time extent of any chart item
//!
//! Missing inputs never fail a build. No periods means an empty grid; a row
//! that is not registered or not laid out yet is left out and takes no space.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::format_cache::{FormatCache, TimeFormatter};
use super::hooks::HookPipeline;
use crate::state::{
    ChartState, DEFAULT_CELL_ID_FORMAT, GridConfig, StatePaths, StateStore, Viewport,
};
use crate::types::{Cell, ContainerSize, GridId, GridResult, Period, Row, RowWithCells};

// =============================================================================
// Inputs
// =============================================================================

/// Everything a build reads, borrowed from the state.
#[derive(Debug, Clone, Copy)]
pub struct GridInputs<'a> {
    pub viewport: Viewport,
    pub scroll_top: Option<f64>,
    pub periods: &'a [Period],
    pub visible_rows: &'a [String],
    pub rows: &'a HashMap<String, Row>,
}

impl<'a> GridInputs<'a> {
    pub fn from_state(state: &'a ChartState) -> Self {
        Self {
            viewport: state.viewport,
            scroll_top: state.scroll_top,
            periods: state.periods(),
            visible_rows: &state.visible_rows,
            rows: &state.rows,
        }
    }
}

/// Size of the frame around the grid: it grows with the scroll offset so
/// the rows scrolled out above stay addressable.
pub fn container_size(inputs: &GridInputs<'_>) -> ContainerSize {
    ContainerSize {
        width: inputs.viewport.width,
        height: inputs.viewport.inner_height + inputs.scroll_top.unwrap_or(0.0),
    }
}

// =============================================================================
// Build
// =============================================================================

/// Build the grid for `inputs`.
///
/// Rows come out in visible-row order with `top` as the running sum of the
/// outer heights before them. Cells come out in period order with ids
/// `"{row id}:{label}"`, labels taken from `cache`. Every cell passes
/// through `hooks` once.
pub fn build_grid(
    inputs: &GridInputs<'_>,
    cache: &mut FormatCache,
    formatter: &dyn TimeFormatter,
    hooks: &HookPipeline,
) -> GridResult {
    if inputs.periods.is_empty() {
        log::debug!("no periods in the active time level, grid is empty");
        return Vec::new();
    }

    let mut grid = Vec::with_capacity(inputs.visible_rows.len());
    let mut seen_rows: HashSet<&str> = HashSet::with_capacity(inputs.visible_rows.len());
    let mut top = 0.0;

    for row_id in inputs.visible_rows {
        if !seen_rows.insert(row_id.as_str()) {
            log::debug!("row {row_id:?} listed twice in visible rows, keeping the first");
            continue;
        }
        let Some(row) = inputs.rows.get(row_id) else {
            log::debug!("visible row {row_id:?} is not in the registry, skipped");
            continue;
        };
        let Some(outer_height) = row.outer_height() else {
            log::debug!("visible row {row_id:?} has no layout data yet, skipped");
            continue;
        };

        let row = Rc::new(row.clone());
        let cells = build_row_cells(&row, top, inputs.periods, cache, formatter, hooks);

        grid.push(Rc::new(RowWithCells {
            row,
            cells,
            top,
            width: inputs.viewport.width,
        }));
        top += outer_height;
    }

    grid
}

fn build_row_cells(
    row: &Rc<Row>,
    top: f64,
    periods: &[Period],
    cache: &mut FormatCache,
    formatter: &dyn TimeFormatter,
    hooks: &HookPipeline,
) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(periods.len());
    let mut ids: HashSet<String> = HashSet::with_capacity(periods.len());

    for period in periods {
        let label = cache.get_or_format(period.left_global, formatter);
        let mut id = format!("{}:{}", row.id, label);

        // Two periods inside one minute share a label.
        if ids.contains(&id) {
            id = format!("{id}@{}", period.left_global);
            if ids.contains(&id) {
                log::debug!(
                    "period starting at {} repeated in the time level, skipped",
                    period.left_global
                );
                continue;
            }
        }
        ids.insert(id.clone());

        cells.push(hooks.apply(Cell {
            id,
            time: period.clone(),
            row: row.clone(),
            top,
        }));
    }

    cells
}

/// Publish grid `id` and its container size as one transaction.
pub fn publish(store: &StateStore, id: GridId, size: ContainerSize, grid: GridResult) {
    store.update(|tx| {
        tx.set_container(id, size);
        tx.set_grid(id, grid);
    });
}

// =============================================================================
// Builder
// =============================================================================

/// Per-instance builder: owns the format cache and the hook pipeline.
pub struct CellMatrixBuilder {
    cache: FormatCache,
    formatter: Rc<dyn TimeFormatter>,
    hooks: HookPipeline,
    builds: u64,
}

impl CellMatrixBuilder {
    /// State the grid depends on. Rebuilds are batched per epoch.
    pub const DEPENDENCIES: StatePaths = StatePaths::ROW_HEIGHTS
        .union(StatePaths::VISIBLE_ROWS)
        .union(StatePaths::ROWS_HEIGHT)
        .union(StatePaths::ITEM_ROWS)
        .union(StatePaths::ITEM_TIMES)
        .union(StatePaths::PERIODS)
        .union(StatePaths::INNER_HEIGHT)
        .union(StatePaths::VIEWPORT_WIDTH);

    pub fn new(formatter: Rc<dyn TimeFormatter>, hooks: HookPipeline) -> Self {
        Self {
            cache: FormatCache::new(DEFAULT_CELL_ID_FORMAT),
            formatter,
            hooks,
            builds: 0,
        }
    }

    /// Build from `state` without publishing.
    pub fn build(&mut self, state: &ChartState) -> (ContainerSize, GridResult) {
        self.cache.set_pattern(&state.grid_config.cell_id_format);
        let inputs = GridInputs::from_state(state);
        let size = container_size(&inputs);
        let grid = build_grid(&inputs, &mut self.cache, self.formatter.as_ref(), &self.hooks);

        self.builds += 1;
        log::trace!(
            "grid rebuilt: {} rows, {} cached labels",
            grid.len(),
            self.cache.len()
        );
        (size, grid)
    }

    /// Build from the store and publish as grid `id`. Returns the
    /// published grid.
    ///
    /// Publishing notifies subscribers before this returns; when the
    /// builder sits behind a `RefCell`, use [`build`](Self::build) and
    /// [`publish`] so the borrow is released first.
    pub fn rebuild(&mut self, store: &StateStore, id: GridId) -> GridResult {
        let (size, grid) = store.read(|state| self.build(state));
        publish(store, id, size, grid.clone());
        grid
    }

    /// Whether `config` asks for cell ids in a pattern other than the one
    /// the current grid was built with.
    pub fn pattern_changed(&self, config: &GridConfig) -> bool {
        self.builds > 0 && self.cache.pattern() != config.cell_id_format
    }

    pub fn format_cache(&self) -> &FormatCache {
        &self.cache
    }

    /// Number of rebuilds run so far.
    pub fn build_count(&self) -> u64 {
        self.builds
    }

    /// Drop cached labels.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
