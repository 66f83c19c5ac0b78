//! State Store - typed state with transactional, batched notification.
//!
//! Writes go through [`StateStore::update`], which hands out a
//! [`Transaction`]. Setters mark the [`StatePaths`] they actually changed;
//! when the closure returns, the marks are committed as one epoch and every
//! subscriber observing any of them is notified.
//!
//! # Bulk delivery
//!
//! A [`SubscribeMode::Bulk`] subscriber fires once per epoch no matter how
//! many of its paths changed. This keeps a rebuild that depends on eight
//! inputs at one run per transaction.
//!
//! # Nested updates
//!
//! Subscribers may write to the store. Those writes are not dispatched
//! re-entrantly: they accumulate and are committed as the next epoch once
//! the current dispatch pass completes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::paths::StatePaths;
use super::schema::{ChartState, GridConfig};
use crate::types::{
    ChartItem, ContainerSize, GridId, GridResult, Period, RootHandle, Row, TimeLevel,
};

// =============================================================================
// Commits & subscriptions
// =============================================================================

/// What a subscriber is told about a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    /// Monotonic, starts at 1 for the first commit.
    pub epoch: u64,
    /// Paths changed in this epoch (a single path in per-path mode).
    pub changed: StatePaths,
}

/// How a subscriber wants changes delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscribeMode {
    /// Once per epoch when any observed path changed.
    #[default]
    Bulk,
    /// Once per changed observed path.
    PerPath,
}

type Callback = Rc<dyn Fn(&Commit)>;

struct Subscriber {
    id: u64,
    paths: StatePaths,
    mode: SubscribeMode,
    active: Rc<Cell<bool>>,
    callback: Callback,
}

/// Keeps a subscription alive. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    active: Rc<Cell<bool>>,
    store: Weak<StoreInner>,
}

impl Subscription {
    /// Stop delivery, including for an epoch currently being dispatched.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(store) = self.store.upgrade() {
            store.subscribers.borrow_mut().retain(|s| s.id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Resets the dispatching flag even if a subscriber panics.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// =============================================================================
// Store
// =============================================================================

struct StoreInner {
    state: RefCell<ChartState>,
    subscribers: RefCell<Vec<Subscriber>>,
    pending: Cell<StatePaths>,
    dispatching: Cell<bool>,
    epoch: Cell<u64>,
    next_subscriber: Cell<u64>,
    next_grid: Cell<u64>,
}

/// Shared, single-threaded chart state. Cloning shares the same store.
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(ChartState::default())
    }
}

impl StateStore {
    pub fn new(state: ChartState) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                subscribers: RefCell::new(Vec::new()),
                pending: Cell::new(StatePaths::empty()),
                dispatching: Cell::new(false),
                epoch: Cell::new(0),
                next_subscriber: Cell::new(0),
                next_grid: Cell::new(0),
            }),
        }
    }

    /// Read the current state.
    ///
    /// Do not call [`update`](Self::update) from inside `f`.
    pub fn read<R>(&self, f: impl FnOnce(&ChartState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Run `f` as one transaction and notify subscribers of what changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut Transaction<'_>) -> R) -> R {
        let (result, changed) = {
            let mut state = self.inner.state.borrow_mut();
            let mut tx = Transaction {
                state: &mut state,
                changed: StatePaths::empty(),
            };
            let result = f(&mut tx);
            (result, tx.changed)
        };

        if !changed.is_empty() {
            self.inner.pending.set(self.inner.pending.get() | changed);
            // Already dispatching: the running loop picks this up next.
            if !self.inner.dispatching.get() {
                self.dispatch();
            }
        }

        result
    }

    /// Subscribe to `paths` with the given delivery mode.
    pub fn subscribe(
        &self,
        paths: StatePaths,
        mode: SubscribeMode,
        callback: impl Fn(&Commit) + 'static,
    ) -> Subscription {
        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);

        let active = Rc::new(Cell::new(true));
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            paths,
            mode,
            active: active.clone(),
            callback: Rc::new(callback),
        });

        Subscription {
            id,
            active,
            store: Rc::downgrade(&self.inner),
        }
    }

    /// Subscribe to several paths, fired once per epoch.
    pub fn subscribe_all(
        &self,
        paths: StatePaths,
        callback: impl Fn(&Commit) + 'static,
    ) -> Subscription {
        self.subscribe(paths, SubscribeMode::Bulk, callback)
    }

    /// Number of the last committed epoch (0 before any commit).
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Allocate an id for a new grid instance on this store.
    pub fn allocate_grid_id(&self) -> GridId {
        let id = self.inner.next_grid.get();
        self.inner.next_grid.set(id + 1);
        GridId(id)
    }

    fn dispatch(&self) {
        let inner = &self.inner;
        inner.dispatching.set(true);
        let _guard = DispatchGuard(&inner.dispatching);

        loop {
            let changed = inner.pending.replace(StatePaths::empty());
            if changed.is_empty() {
                break;
            }

            let epoch = inner.epoch.get() + 1;
            inner.epoch.set(epoch);
            log::trace!("state commit: epoch {epoch}, changed {changed:?}");

            // Snapshot so subscribers can (un)subscribe while we deliver.
            let targets: Vec<(StatePaths, SubscribeMode, Rc<Cell<bool>>, Callback)> = inner
                .subscribers
                .borrow()
                .iter()
                .filter(|s| s.paths.intersects(changed))
                .map(|s| (s.paths, s.mode, s.active.clone(), s.callback.clone()))
                .collect();

            for (paths, mode, active, callback) in targets {
                let observed = paths & changed;
                match mode {
                    SubscribeMode::Bulk => {
                        if active.get() {
                            callback(&Commit {
                                epoch,
                                changed: observed,
                            });
                        }
                    }
                    SubscribeMode::PerPath => {
                        for path in observed.iter() {
                            if !active.get() {
                                break;
                            }
                            callback(&Commit {
                                epoch,
                                changed: path,
                            });
                        }
                    }
                }
            }
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Write access to the state for the duration of one update.
pub struct Transaction<'a> {
    state: &'a mut ChartState,
    changed: StatePaths,
}

/// Replace `slot` with `value`, reporting whether it differed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

impl Transaction<'_> {
    /// Current (partially updated) state.
    pub fn state(&self) -> &ChartState {
        self.state
    }

    /// Paths marked so far.
    pub fn changed(&self) -> StatePaths {
        self.changed
    }

    /// Mark paths as changed without going through a setter.
    pub fn mark(&mut self, paths: StatePaths) {
        self.changed |= paths;
    }

    /// Mutate the state directly, marking `paths` as changed.
    pub fn state_mut(&mut self, paths: StatePaths) -> &mut ChartState {
        self.changed |= paths;
        self.state
    }

    fn mark_if(&mut self, changed: bool, paths: StatePaths) {
        if changed {
            self.changed |= paths;
        }
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        let changed = replace(&mut self.state.viewport.width, width);
        self.mark_if(changed, StatePaths::VIEWPORT_WIDTH);
    }

    pub fn set_inner_height(&mut self, height: f64) {
        let changed = replace(&mut self.state.viewport.inner_height, height);
        self.mark_if(changed, StatePaths::INNER_HEIGHT);
    }

    pub fn set_scroll_top(&mut self, top: Option<f64>) {
        let changed = replace(&mut self.state.scroll_top, top);
        self.mark_if(changed, StatePaths::SCROLL_TOP);
    }

    pub fn set_time_level(&mut self, level: Option<TimeLevel>) {
        let changed = replace(&mut self.state.time_level, level);
        self.mark_if(changed, StatePaths::PERIODS);
    }

    /// Shorthand for a time level holding `periods`.
    pub fn set_periods(&mut self, periods: Vec<Period>) {
        self.set_time_level(Some(TimeLevel { periods }));
    }

    pub fn set_visible_rows(&mut self, ids: Vec<String>) {
        let changed = replace(&mut self.state.visible_rows, ids);
        self.mark_if(changed, StatePaths::VISIBLE_ROWS);
    }

    pub fn set_rows_height(&mut self, height: f64) {
        let changed = replace(&mut self.state.rows_height, height);
        self.mark_if(changed, StatePaths::ROWS_HEIGHT);
    }

    /// Insert or replace a row in the registry.
    pub fn insert_row(&mut self, row: Row) {
        let previous = self.state.rows.get(&row.id);
        let height_changed = previous.map(Row::outer_height) != Some(row.outer_height());
        let row_changed = previous != Some(&row);

        self.mark_if(row_changed, StatePaths::ROWS);
        self.mark_if(height_changed, StatePaths::ROW_HEIGHTS);
        if row_changed {
            self.state.rows.insert(row.id.clone(), row);
        }
    }

    pub fn remove_row(&mut self, id: &str) {
        if self.state.rows.remove(id).is_some() {
            self.changed |= StatePaths::ROWS | StatePaths::ROW_HEIGHTS;
        }
    }

    /// Replace the whole row registry.
    pub fn set_rows(&mut self, rows: HashMap<String, Row>) {
        let changed = replace(&mut self.state.rows, rows);
        self.mark_if(changed, StatePaths::ROWS | StatePaths::ROW_HEIGHTS);
    }

    /// Insert or replace a chart item.
    pub fn insert_item(&mut self, item: ChartItem) {
        let (row_changed, time_changed) = match self.state.items.get(&item.id) {
            Some(prev) => (prev.row_id != item.row_id, prev.time != item.time),
            None => (true, true),
        };
        self.mark_if(row_changed, StatePaths::ITEM_ROWS);
        self.mark_if(time_changed, StatePaths::ITEM_TIMES);
        self.state.items.insert(item.id.clone(), item);
    }

    pub fn remove_item(&mut self, id: &str) {
        if self.state.items.remove(id).is_some() {
            self.changed |= StatePaths::ITEM_ROWS | StatePaths::ITEM_TIMES;
        }
    }

    pub fn set_grid_config(&mut self, config: GridConfig) {
        let changed = replace(&mut self.state.grid_config, config);
        self.mark_if(changed, StatePaths::GRID_CONFIG);
    }

    /// Publish grid `id`'s result as a whole.
    ///
    /// Compared by entry identity: a rebuilt grid is a new grid even when
    /// its content matches.
    pub fn set_grid(&mut self, id: GridId, grid: GridResult) {
        let published = self.state.grids.entry(id).or_default();
        let same = published.rows.len() == grid.len()
            && published
                .rows
                .iter()
                .zip(&grid)
                .all(|(a, b)| Rc::ptr_eq(a, b));
        if !same {
            published.rows = grid;
            published.revision += 1;
            self.changed |= StatePaths::GRID;
        }
    }

    pub fn set_container(&mut self, id: GridId, size: ContainerSize) {
        let published = self.state.grids.entry(id).or_default();
        let changed = replace(&mut published.container, size);
        self.mark_if(changed, StatePaths::CONTAINER);
    }

    /// Withdraw everything grid `id` published. Returns `false` if it had
    /// published nothing.
    pub fn remove_grid(&mut self, id: GridId) -> bool {
        if self.state.grids.remove(&id).is_none() {
            return false;
        }
        self.changed |= StatePaths::GRID | StatePaths::CONTAINER;
        true
    }

    /// Register a root handle. Returns `false` if it was already registered.
    pub fn insert_handle(&mut self, id: GridId, handle: RootHandle) -> bool {
        if self.state.handles.get(&id) == Some(&handle) {
            return false;
        }
        self.state.handles.insert(id, handle);
        self.changed |= StatePaths::HANDLES;
        true
    }

    /// Remove `id` only if it still maps to `handle`.
    pub fn remove_handle(&mut self, id: GridId, handle: &RootHandle) -> bool {
        if self.state.handles.get(&id) != Some(handle) {
            return false;
        }
        self.state.handles.remove(&id);
        self.changed |= StatePaths::HANDLES;
        true
    }
}
