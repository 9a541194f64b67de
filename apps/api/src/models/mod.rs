pub mod patch;
pub mod profile;
pub mod source;
