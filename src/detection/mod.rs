//! Detection orchestration and observation persistence.

mod observation;
mod orchestrator;
mod store;

pub use observation::Observation;
pub use orchestrator::{
    DetectionOrchestrator, DetectionOutcome, PendingWrites, PersistenceReport, WriteOutcome,
    distinct_species,
};
pub use store::{JsonlObservationStore, MemoryObservationStore, ObservationStore};
