//! Pipeline driver: source text to a checked module.

mod compile;

pub use compile::{CheckedModule, check_source, check_source_partial};
