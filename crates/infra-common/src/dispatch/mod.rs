//! Single serialization domain
//!
//! Components whose state must only be touched from one logical thread post
//! closures through a [`DispatcherHandle`]. Exactly one owner drains the
//! matching [`TaskQueue`], either synchronously with
//! [`TaskQueue::run_until_idle`] or as a tokio task with [`TaskQueue::spawn`].
//! Handles are cheap to clone and can be used from any thread, which is how
//! callbacks arriving on foreign executors get marshalled back onto the
//! domain before they mutate anything.

mod queue;

pub use queue::{Dispatcher, DispatcherHandle, Task, TaskQueue};
