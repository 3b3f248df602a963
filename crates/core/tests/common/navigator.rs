//! Recording navigator for tests.

use af_core::completion::{NavigationError, Navigator};
use af_core::state::ExecutionStore;
use af_protocol::execution_models::Phase;
use af_protocol::record_models::Destination;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records each navigation together with the store phase at that moment.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<(Destination, Option<Phase>)>>>,
    store: Arc<Mutex<Option<ExecutionStore>>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `store` so each visit records the phase it saw.
    pub fn watch(&self, store: &ExecutionStore) {
        *self.store.lock().unwrap() = Some(store.clone());
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.visits
            .lock()
            .unwrap()
            .iter()
            .map(|(destination, _)| destination.clone())
            .collect()
    }

    /// Phase of the watched store at each navigation.
    pub fn phases_seen(&self) -> Vec<Option<Phase>> {
        self.visits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, phase)| *phase)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.visits.lock().unwrap().len()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, destination: Destination) -> Result<(), NavigationError> {
        let phase = self.store.lock().unwrap().as_ref().map(ExecutionStore::phase);
        self.visits.lock().unwrap().push((destination, phase));
        Ok(())
    }
}
