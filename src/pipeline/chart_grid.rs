//! Chart Grid - one wired grid instance.
//!
//! Composes the pipeline for one grid:
//!
//! ```text
//! StateStore ──(DEPENDENCIES, bulk)──→ CellMatrixBuilder::rebuild
//!            ←── grids[id] ───────────┘
//! StateStore ──(GRID | GRID_CONFIG)──→ RowReconciler::reconcile → RenderRequests
//! ```
//!
//! Every piece of per-grid state (format cache, live renderers, handle
//! registration, published result, subscriptions) is owned by the
//! [`ChartGrid`] and released by [`ChartGrid::destroy`] or on drop. Several
//! grids can share one store; each publishes under its own [`GridId`].
//!
//! # Example
//!
//! ```ignore
//! let grid = ChartGridBuilder::new(store.clone())
//!     .renderer_factory(Rc::new(|entry, key| Box::new(MyRow::new(entry, key))))
//!     .key_by(KeyBy::row_id())
//!     .build()?;
//!
//! let requests = grid.render_requests();
//! let stop = effect(move || {
//!     let _ = requests.get();
//!     // render the rows
//! });
//!
//! grid.destroy();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spark_signals::Signal;

use super::lifecycle::LifecycleBinder;
use crate::engine::{
    CellHook, CellMatrixBuilder, ChronoFormatter, GridInputs, HookPipeline, TimeFormatter,
    container_size, publish,
};
use crate::error::{GridError, Result};
use crate::renderer::{
    KeyBy, ReconcileStats, RenderRequests, RendererFactory, RowKey, RowReconciler,
};
use crate::state::{StatePaths, StateStore, Subscription};
use crate::types::{ContainerSize, GridId, GridResult, RootHandle};

/// What the reconciler follows besides the grid itself.
const RECONCILE_DEPENDENCIES: StatePaths = StatePaths::GRID.union(StatePaths::GRID_CONFIG);

/// Config changes only rebuild when the cell id pattern moved.
const REBUILD_TRIGGERS: StatePaths =
    CellMatrixBuilder::DEPENDENCIES.union(StatePaths::GRID_CONFIG);

// =============================================================================
// Builder
// =============================================================================

/// Collects the collaborators of a grid. Renderer factory and key strategy
/// are required.
pub struct ChartGridBuilder {
    store: StateStore,
    factory: Option<RendererFactory>,
    key_by: Option<KeyBy>,
    hooks: Vec<CellHook>,
    formatter: Rc<dyn TimeFormatter>,
    root_handle: Option<RootHandle>,
}

impl ChartGridBuilder {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            factory: None,
            key_by: None,
            hooks: Vec::new(),
            formatter: Rc::new(ChronoFormatter),
            root_handle: None,
        }
    }

    pub fn renderer_factory(mut self, factory: RendererFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn key_by(mut self, key_by: KeyBy) -> Self {
        self.key_by = Some(key_by);
        self
    }

    /// Append a cell hook. Hooks run in the order they were added.
    pub fn hook(mut self, hook: CellHook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn hooks(mut self, hooks: impl IntoIterator<Item = CellHook>) -> Self {
        self.hooks.extend(hooks);
        self
    }

    pub fn formatter(mut self, formatter: Rc<dyn TimeFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Handle published for this grid. Defaults to the grid id.
    pub fn root_handle(mut self, handle: RootHandle) -> Self {
        self.root_handle = Some(handle);
        self
    }

    /// Wire the grid: attach, subscribe, then build and reconcile once.
    pub fn build(self) -> Result<ChartGrid> {
        let factory = self.factory.ok_or(GridError::MissingRendererFactory)?;
        let key_by = self.key_by.ok_or(GridError::MissingKeyFunction)?;

        let store = self.store;
        let id = store.allocate_grid_id();
        let handle = self
            .root_handle
            .unwrap_or_else(|| RootHandle::new(id.to_string()));

        let builder = Rc::new(RefCell::new(CellMatrixBuilder::new(
            self.formatter,
            HookPipeline::new(self.hooks),
        )));
        let reconciler = Rc::new(RefCell::new(RowReconciler::new(key_by, factory)));
        let render_requests = RenderRequests::new();

        let binder = LifecycleBinder::new(id, handle);
        binder.attach(&store);

        let subscriptions = vec![
            subscribe_rebuild(&store, id, &builder),
            subscribe_reconcile(&store, id, &reconciler, &render_requests),
            subscribe_scroll(&store, id),
        ];

        let grid = ChartGrid {
            id,
            store,
            builder,
            reconciler,
            render_requests,
            binder,
            subscriptions,
            destroyed: false,
        };
        grid.rebuild();
        log::debug!("{} mounted", grid.id);

        Ok(grid)
    }
}

fn subscribe_rebuild(
    store: &StateStore,
    id: GridId,
    builder: &Rc<RefCell<CellMatrixBuilder>>,
) -> Subscription {
    let weak_builder: Weak<RefCell<CellMatrixBuilder>> = Rc::downgrade(builder);
    let source = store.clone();

    store.subscribe_all(REBUILD_TRIGGERS, move |commit| {
        let Some(builder) = weak_builder.upgrade() else {
            return;
        };
        if !commit.changed.intersects(CellMatrixBuilder::DEPENDENCIES) {
            let stale = source.read(|state| builder.borrow().pattern_changed(&state.grid_config));
            if !stale {
                return;
            }
        }
        rebuild_and_publish(&source, id, &builder);
    })
}

fn rebuild_and_publish(
    store: &StateStore,
    id: GridId,
    builder: &RefCell<CellMatrixBuilder>,
) -> GridResult {
    let (size, grid) = store.read(|state| builder.borrow_mut().build(state));
    // Borrow released: subscribers run while publishing.
    publish(store, id, size, grid.clone());
    grid
}

fn subscribe_reconcile(
    store: &StateStore,
    id: GridId,
    reconciler: &Rc<RefCell<RowReconciler>>,
    render_requests: &RenderRequests,
) -> Subscription {
    let weak_reconciler = Rc::downgrade(reconciler);
    let requests = render_requests.clone();
    let source = store.clone();
    let reconciled_revision = Cell::new(0);

    store.subscribe_all(RECONCILE_DEPENDENCIES, move |commit| {
        let Some(reconciler) = weak_reconciler.upgrade() else {
            return;
        };
        let revision = source.read(|state| state.grid_revision(id));
        // Another grid on this store published.
        if !commit.changed.contains(StatePaths::GRID_CONFIG)
            && revision == reconciled_revision.get()
        {
            return;
        }
        reconciled_revision.set(revision);
        reconcile_published(&source, id, &reconciler, &requests);
    })
}

/// Scrolling does not change the grid, only the frame around it.
fn subscribe_scroll(store: &StateStore, id: GridId) -> Subscription {
    let source = store.clone();

    store.subscribe_all(StatePaths::SCROLL_TOP, move |_| {
        let size = source.read(|state| container_size(&GridInputs::from_state(state)));
        source.update(|tx| tx.set_container(id, size));
    })
}

fn reconcile_published(
    store: &StateStore,
    id: GridId,
    reconciler: &RefCell<RowReconciler>,
    requests: &RenderRequests,
) -> ReconcileStats {
    let grid = store.read(|state| state.grid(id));
    let stats = reconciler.borrow_mut().reconcile(&grid);
    // Borrow released: the render effect may call back into the grid.
    requests.request();
    stats
}

// =============================================================================
// Chart Grid
// =============================================================================

/// A live grid instance bound to a store.
pub struct ChartGrid {
    id: GridId,
    store: StateStore,
    builder: Rc<RefCell<CellMatrixBuilder>>,
    reconciler: Rc<RefCell<RowReconciler>>,
    render_requests: RenderRequests,
    binder: LifecycleBinder,
    subscriptions: Vec<Subscription>,
    destroyed: bool,
}

impl ChartGrid {
    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn root_handle(&self) -> &RootHandle {
        self.binder.handle()
    }

    /// The grid this instance currently has published.
    pub fn grid(&self) -> GridResult {
        self.store.read(|state| state.grid(self.id))
    }

    pub fn container(&self) -> ContainerSize {
        self.store.read(|state| state.container(self.id))
    }

    /// Keys of the live row renderers, in grid order.
    pub fn live_keys(&self) -> Vec<RowKey> {
        self.reconciler.borrow().keys()
    }

    pub fn format_cache_len(&self) -> usize {
        self.builder.borrow().format_cache().len()
    }

    /// Rebuilds run so far.
    pub fn build_count(&self) -> u64 {
        self.builder.borrow().build_count()
    }

    /// Signal bumped once per reconcile. Mount the render effect on it.
    pub fn render_requests(&self) -> Signal<u64> {
        self.render_requests.signal()
    }

    pub fn render_request_count(&self) -> u64 {
        self.render_requests.count()
    }

    /// Rebuild now and publish. Reconciliation follows through the store.
    pub fn rebuild(&self) -> GridResult {
        if self.destroyed {
            return Vec::new();
        }
        rebuild_and_publish(&self.store, self.id, &self.builder)
    }

    /// Reconcile the published grid again without rebuilding it.
    pub fn reconcile(&self) -> ReconcileStats {
        if self.destroyed {
            return ReconcileStats::default();
        }
        reconcile_published(&self.store, self.id, &self.reconciler, &self.render_requests)
    }

    /// Render every live row in grid order with the current grid config.
    ///
    /// Skipped while a reconcile pass is running; that pass ends with a
    /// render request of its own.
    pub fn render(&self) {
        let config = self.store.read(|state| state.grid_config.clone());
        match self.reconciler.try_borrow_mut() {
            Ok(mut reconciler) => reconciler.render_all(&config),
            Err(_) => log::debug!("{} render skipped, rows are being reconciled", self.id),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear the grid down: the published result is withdrawn and
    /// everything else released before this returns.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        let id = self.id;
        self.store.update(|tx| tx.remove_grid(id));
        let released = self.reconciler.borrow_mut().clear();
        self.binder.detach(&self.store);
        self.builder.borrow_mut().clear();

        log::debug!("{} destroyed, {released} row renderers released", self.id);
    }
}

impl Drop for ChartGrid {
    fn drop(&mut self) {
        self.destroy();
    }
}
