// Shared fixtures for application tests

use crate::application::collateral::CollateralExecutor;
use crate::application::scope::Coordinator;
use crate::port::backend::mocks::{event_log, RecordingBackend};
use crate::port::time_provider::FixedTimeProvider;
use crate::port::transaction::mocks::InMemoryStore;
use crate::port::TimeProvider;
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000_000;

/// In-memory store and recording backends sharing one event log
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub backend: Arc<RecordingBackend>,
    pub coordinator: Coordinator,
}

impl Harness {
    pub fn new() -> Self {
        let events = event_log();
        let store = Arc::new(InMemoryStore::with_log(events.clone()));
        let backend = Arc::new(RecordingBackend::with_log(events));
        let collateral = Arc::new(CollateralExecutor::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
        ));
        let coordinator =
            Coordinator::new(store.clone(), collateral, Arc::new(FixedTimeProvider(NOW)));
        Self {
            store,
            backend,
            coordinator,
        }
    }

    pub fn time_provider(&self) -> Arc<dyn TimeProvider> {
        Arc::new(FixedTimeProvider(NOW))
    }
}
