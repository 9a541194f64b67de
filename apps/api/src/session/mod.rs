// Editing sessions: one document store per session, plus the HTTP handlers.

pub mod editor;
pub mod handlers;
pub mod registry;

pub use editor::SessionServices;
pub use registry::SessionRegistry;
