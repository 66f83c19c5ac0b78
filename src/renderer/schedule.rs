//! Render scheduling - one re-render request per reconcile.
//!
//! The grid never renders on its own. It bumps a counter signal, and the
//! host mounts the one effect that reads it and renders:
//!
//! ```ignore
//! let requests = grid.render_requests();
//! let stop = effect(move || {
//!     let _ = requests.get();
//!     host_render();
//! });
//! ```

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::{Signal, signal};

/// Counts render requests and publishes the count as a signal.
#[derive(Clone)]
pub struct RenderRequests {
    count: Rc<Cell<u64>>,
    signal: Signal<u64>,
}

impl Default for RenderRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderRequests {
    pub fn new() -> Self {
        Self {
            count: Rc::new(Cell::new(0)),
            signal: signal(0),
        }
    }

    /// Schedule one render.
    pub fn request(&self) {
        // Counted outside the signal so requesting from inside an effect
        // does not subscribe that effect to its own request.
        let next = self.count.get() + 1;
        self.count.set(next);
        self.signal.set(next);
    }

    /// Requests made so far.
    pub fn count(&self) -> u64 {
        self.count.get()
    }

    /// Signal carrying the request count.
    pub fn signal(&self) -> Signal<u64> {
        self.signal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::effect;

    #[test]
    fn test_each_request_reruns_effect_once() {
        let requests = RenderRequests::new();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let sig = requests.signal();

        let _stop = effect(move || {
            let _ = sig.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        requests.request();
        assert_eq!(runs.get(), 2);
        assert_eq!(requests.count(), 1);

        requests.request();
        assert_eq!(runs.get(), 3);
    }
}
