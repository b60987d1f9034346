//! Error types shared by the rcast crates

pub mod types;

pub use types::{Error, Result};
