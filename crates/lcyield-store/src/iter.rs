use tracing::info;

use crate::error::Result;
use crate::store::EventStore;

/// Row walk over an [`EventStore`]. Yields each row index after its active
/// cells have been loaded; the first error ends the walk.
pub struct Entries<'a> {
    store: &'a mut EventStore,
    next: u64,
    total: u64,
    step: u64,
    started: bool,
    done: bool,
}

impl<'a> Entries<'a> {
    pub(crate) fn new(store: &'a mut EventStore) -> Self {
        Self {
            store,
            next: 0,
            total: 0,
            step: 1,
            started: false,
            done: false,
        }
    }

    /// The store being walked, for reads between steps.
    pub fn store(&self) -> &EventStore {
        &*self.store
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            self.store.cursor = None;
            if let Err(e) = self.store.validate() {
                self.done = true;
                return Some(Err(e));
            }
            self.total = self.store.entries();
            // progress is reported in 5% increments
            self.step = self.total.div_ceil(20).max(1);
        }
        if self.next >= self.total {
            self.done = true;
            if self.store.show_progress() && self.total > 0 {
                info!(store = self.store.name(), entries = self.total, "iteration complete");
            }
            return None;
        }

        let n = self.next;
        if let Err(e) = self.store.load_entry(n) {
            self.done = true;
            return Some(Err(e));
        }
        if self.store.show_progress() && n % self.step == 0 {
            let percent = (n / self.step) * 5;
            info!(store = self.store.name(), percent, entry = n, "progress");
        }
        self.next += 1;
        Some(Ok(n))
    }
}
