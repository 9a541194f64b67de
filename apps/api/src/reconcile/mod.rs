// Reconciliation of externally sourced profiles with the edited document.

pub mod resolver;

pub use resolver::{merge_source, MergeReport};
