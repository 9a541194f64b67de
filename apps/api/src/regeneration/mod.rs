// Per-field AI regeneration: target addressing, pending markers, coordinator.

pub mod coordinator;
pub mod pending;
pub mod target;

pub use coordinator::{RegenerationCoordinator, RegenerationOutcome};
pub use target::RegenerationTarget;
