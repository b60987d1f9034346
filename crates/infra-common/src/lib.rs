//! # rcast-infra-common
//!
//! Shared infrastructure for the rcast crates:
//!
//! - [`errors`]: infrastructure error type
//! - [`logging`]: `tracing-subscriber` setup
//! - [`dispatch`]: the single serialization domain that owns session and
//!   discovery state

pub mod dispatch;
pub mod errors;
pub mod logging;

pub use dispatch::{Dispatcher, DispatcherHandle, Task, TaskQueue};
pub use errors::{Error, Result};
pub use logging::{setup_logging, LoggingConfig};
