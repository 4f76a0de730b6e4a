pub mod format;
pub mod sessions;
pub mod validation;
