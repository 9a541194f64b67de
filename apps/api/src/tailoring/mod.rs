pub mod engine;

pub use engine::{GenerationOutcome, TailorOutcome, TailoringEngine};
