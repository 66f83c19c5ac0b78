//! Row renderers - keyed reconciliation and render scheduling.

mod reconcile;
mod schedule;

pub use reconcile::{
    KeyBy, ReconcileStats, RendererFactory, RowEntry, RowKey, RowReconciler, RowRenderer,
};
pub use schedule::RenderRequests;
