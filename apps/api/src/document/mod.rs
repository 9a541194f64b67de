// Canonical per-session document and the built-in sample it starts from.

pub mod sample;
pub mod store;

pub use sample::sample_document;
pub use store::{ChangeOrigin, DocumentStore, EditFlags, StoreState};
