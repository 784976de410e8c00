use parking_lot::Mutex;
use serde::Serialize;

/// Publisher counters since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub messages_published: u64,
    pub consumers_invoked: u64,
    pub detached_dispatches: u64,
    pub failures_propagated: u64,
    pub resolution_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<DispatchStats>,
}

impl StatsRecorder {
    pub(crate) fn record(&self, update: impl FnOnce(&mut DispatchStats)) {
        update(&mut self.inner.lock());
    }

    pub(crate) fn snapshot(&self) -> DispatchStats {
        self.inner.lock().clone()
    }
}
