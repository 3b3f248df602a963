//! Completion: the rate-limited "continue" action and its side effects.

pub mod coordinator;
pub mod gate;
pub mod records;

pub use coordinator::{CompletionCoordinator, CompletionReport, NavigationStep, RecordStep};
pub use gate::ActionGate;
pub use records::{
    MemoryRecordStore, NavigationError, Navigator, RecordError, RecordResult, RecordStore,
};
