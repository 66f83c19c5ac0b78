//! Errors for grid composition.
//!
//! Building and reconciling never fail: missing inputs degrade to an empty
//! or partial grid. The only errors are missing collaborators, reported
//! when a [`ChartGrid`](crate::pipeline::ChartGrid) is put together.

/// Contract violations detected while wiring a grid instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// No renderer factory was supplied.
    #[error("chart grid requires a row renderer factory")]
    MissingRendererFactory,

    /// No reconciliation key strategy was supplied.
    #[error("chart grid requires a row key strategy")]
    MissingKeyFunction,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;
