//! Row Renderer Reconciler - keyed reuse of row renderers across grids.
//!
//! Every grid entry is matched to a live renderer by key:
//! - New keys: create signal + renderer through the factory
//! - Existing keys: update the signal (NO renderer recreation!)
//! - Removed keys: destroy the renderer
//!
//! Renderers read their entry through a getter backed by a spark-signals
//! [`Signal`], so a renderer that tracks the getter inside an effect sees
//! in-place updates without being rebuilt.
//!
//! # Keys
//!
//! [`KeyBy::StableId`] (row id by default) survives rebuilds.
//! [`KeyBy::Identity`] keys by the entry allocation: every rebuild produces
//! new entries, so only re-reconciling the same published grid reuses
//! renderers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use spark_signals::{Signal, signal};

use crate::state::GridConfig;
use crate::types::RowWithCells;

// =============================================================================
// Renderers
// =============================================================================

/// Getter for the current entry of a row renderer.
pub type RowEntry = Rc<dyn Fn() -> Rc<RowWithCells>>;

/// A stateful renderer for one grid row.
pub trait RowRenderer {
    /// Produce the row's visual representation from the current entry.
    /// `config` carries the row and cell class names.
    fn render(&mut self, config: &GridConfig);

    /// Release everything this renderer holds. Called exactly once.
    fn destroy(&mut self);
}

/// Creates a renderer for a newly seen key.
pub type RendererFactory = Rc<dyn Fn(RowEntry, &RowKey) -> Box<dyn RowRenderer>>;

// =============================================================================
// Keys
// =============================================================================

/// Reconciliation key of a grid entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// Address of the entry allocation.
    Identity(usize),
    Stable(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Identity(addr) => write!(f, "#{addr:x}"),
            RowKey::Stable(key) => f.write_str(key),
        }
    }
}

/// How grid entries are keyed.
#[derive(Clone)]
pub enum KeyBy {
    Identity,
    StableId(Rc<dyn Fn(&RowWithCells) -> String>),
}

impl KeyBy {
    /// Key by row id.
    pub fn row_id() -> Self {
        KeyBy::StableId(Rc::new(|entry: &RowWithCells| entry.row.id.clone()))
    }

    pub fn key(&self, entry: &Rc<RowWithCells>) -> RowKey {
        match self {
            // The reconciler holds every live entry, so a live address is
            // never reused by a fresh allocation.
            KeyBy::Identity => RowKey::Identity(Rc::as_ptr(entry) as usize),
            KeyBy::StableId(key_fn) => RowKey::Stable(key_fn(entry.as_ref())),
        }
    }
}

impl Default for KeyBy {
    fn default() -> Self {
        Self::row_id()
    }
}

impl fmt::Debug for KeyBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyBy::Identity => f.write_str("Identity"),
            KeyBy::StableId(_) => f.write_str("StableId(..)"),
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// What one reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
}

struct LiveRow {
    key: RowKey,
    entry: Signal<Rc<RowWithCells>>,
    renderer: Box<dyn RowRenderer>,
}

/// Live row renderers, in the order of the last reconciled grid.
pub struct RowReconciler {
    key_by: KeyBy,
    factory: RendererFactory,
    live: Vec<LiveRow>,
}

impl RowReconciler {
    pub fn new(key_by: KeyBy, factory: RendererFactory) -> Self {
        Self {
            key_by,
            factory,
            live: Vec::new(),
        }
    }

    /// Match `grid` against the live renderers.
    ///
    /// Afterwards the live renderers are exactly one per distinct key of
    /// `grid`, in grid order. Duplicate keys are warned about and skipped.
    pub fn reconcile(&mut self, grid: &[Rc<RowWithCells>]) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let mut previous: HashMap<RowKey, LiveRow> = self
            .live
            .drain(..)
            .map(|row| (row.key.clone(), row))
            .collect();
        let mut current_keys: HashSet<RowKey> = HashSet::with_capacity(grid.len());
        let mut next = Vec::with_capacity(grid.len());

        for entry in grid {
            let key = self.key_by.key(entry);

            if !current_keys.insert(key.clone()) {
                log::warn!(
                    "duplicate row key {key} in grid. Keys must be unique, \
                     only the first occurrence is rendered"
                );
                continue;
            }

            if let Some(existing) = previous.remove(&key) {
                // EXISTING row - update the signal in place
                existing.entry.set(entry.clone());
                stats.updated += 1;
                next.push(existing);
            } else {
                // NEW row - create signal and renderer
                let entry_signal = signal(entry.clone());
                let signal_for_getter = entry_signal.clone();
                let getter: RowEntry = Rc::new(move || signal_for_getter.get());

                let renderer = (self.factory)(getter, &key);
                stats.created += 1;
                next.push(LiveRow {
                    key,
                    entry: entry_signal,
                    renderer,
                });
            }
        }

        // Whatever was not matched is gone
        for (_, mut removed) in previous {
            removed.renderer.destroy();
            stats.destroyed += 1;
        }

        self.live = next;
        log::trace!(
            "rows reconciled: {} created, {} updated, {} destroyed",
            stats.created,
            stats.updated,
            stats.destroyed
        );
        stats
    }

    /// Render every live row in order.
    pub fn render_all(&mut self, config: &GridConfig) {
        for row in &mut self.live {
            row.renderer.render(config);
        }
    }

    /// Live keys in order.
    pub fn keys(&self) -> Vec<RowKey> {
        self.live.iter().map(|row| row.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Destroy every live renderer. Returns how many were destroyed.
    pub fn clear(&mut self) -> usize {
        let count = self.live.len();
        for mut row in self.live.drain(..) {
            row.renderer.destroy();
        }
        count
    }
}

impl Drop for RowReconciler {
    fn drop(&mut self) {
        self.clear();
    }
}
