//! Extension Hook Pipeline - per-cell transforms applied at creation time.

use std::fmt;
use std::rc::Rc;

use crate::types::Cell;

/// Transforms a freshly built cell.
pub type CellHook = Rc<dyn Fn(Cell) -> Cell>;

/// Ordered list of cell hooks, fixed at construction.
///
/// Hooks run left to right, each receiving the previous hook's output.
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<CellHook>,
}

impl HookPipeline {
    pub fn new(hooks: Vec<CellHook>) -> Self {
        Self { hooks }
    }

    /// Run `cell` through every hook in registration order.
    pub fn apply(&self, cell: Cell) -> Cell {
        self.hooks.iter().fold(cell, |cell, hook| hook(cell))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl FromIterator<CellHook> for HookPipeline {
    fn from_iter<I: IntoIterator<Item = CellHook>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
