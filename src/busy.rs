use std::collections::HashSet;
use std::sync::Mutex;

/// Ids of contracts with a completion request in flight.
#[derive(Debug, Default)]
pub struct BusyContracts {
    inner: Mutex<HashSet<u64>>,
}

impl BusyContracts {
    /// Marks `id` busy, or returns `None` if a request for it is already outstanding.
    /// The flag clears when the guard drops, whatever the request's outcome.
    pub fn try_acquire(&self, id: u64) -> Option<BusyGuard<'_>> {
        let mut set = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if set.insert(id) {
            Some(BusyGuard { owner: self, id })
        } else {
            None
        }
    }

    pub fn is_busy(&self, id: u64) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }
}

pub struct BusyGuard<'a> {
    owner: &'a BusyContracts,
    id: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}
