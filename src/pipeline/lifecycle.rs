//! Lifecycle Binder - publishes a grid's root handle in shared state.
//!
//! Other collaborators find a grid through `ChartState::handles`. Attach
//! and detach are idempotent, and detach only removes the entry if it
//! still belongs to this binder, so repeated attach/detach cycles never
//! leave duplicates or orphans behind.

use crate::state::StateStore;
use crate::types::{GridId, RootHandle};

pub struct LifecycleBinder {
    id: GridId,
    handle: RootHandle,
}

impl LifecycleBinder {
    pub fn new(id: GridId, handle: RootHandle) -> Self {
        Self { id, handle }
    }

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn handle(&self) -> &RootHandle {
        &self.handle
    }

    /// Register the handle. Returns `false` if it already was.
    pub fn attach(&self, store: &StateStore) -> bool {
        let inserted = store.update(|tx| tx.insert_handle(self.id, self.handle.clone()));
        if inserted {
            log::trace!("{} attached as {:?}", self.id, self.handle.0);
        }
        inserted
    }

    /// Remove the handle. Returns `false` if it was not registered.
    pub fn detach(&self, store: &StateStore) -> bool {
        let removed = store.update(|tx| tx.remove_handle(self.id, &self.handle));
        if removed {
            log::trace!("{} detached", self.id);
        }
        removed
    }

    pub fn is_attached(&self, store: &StateStore) -> bool {
        store.read(|state| state.handles.get(&self.id) == Some(&self.handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StatePaths;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_attach_is_idempotent() {
        let store = StateStore::default();
        let binder = LifecycleBinder::new(store.allocate_grid_id(), RootHandle::new("root"));

        assert!(binder.attach(&store));
        assert!(!binder.attach(&store));
        assert!(binder.is_attached(&store));
        assert_eq!(store.read(|s| s.handles.len()), 1);
    }

    #[test]
    fn test_repeated_cycles_leave_nothing() {
        let store = StateStore::default();
        let binder = LifecycleBinder::new(store.allocate_grid_id(), RootHandle::new("root"));

        for _ in 0..3 {
            binder.attach(&store);
            binder.attach(&store);
            binder.detach(&store);
            binder.detach(&store);
        }

        assert!(!binder.is_attached(&store));
        assert!(store.read(|s| s.handles.is_empty()));
    }

    #[test]
    fn test_detach_keeps_other_grids() {
        let store = StateStore::default();
        let a = LifecycleBinder::new(store.allocate_grid_id(), RootHandle::new("a"));
        let b = LifecycleBinder::new(store.allocate_grid_id(), RootHandle::new("b"));

        a.attach(&store);
        b.attach(&store);
        a.detach(&store);

        assert!(!a.is_attached(&store));
        assert!(b.is_attached(&store));
    }

    #[test]
    fn test_noop_attach_does_not_notify() {
        let store = StateStore::default();
        let binder = LifecycleBinder::new(store.allocate_grid_id(), RootHandle::new("root"));
        let notified = Rc::new(Cell::new(0));
        let notified_clone = notified.clone();
        let _sub = store.subscribe_all(StatePaths::HANDLES, move |_| {
            notified_clone.set(notified_clone.get() + 1)
        });

        binder.attach(&store);
        binder.attach(&store);

        assert_eq!(notified.get(), 1);
    }
}
