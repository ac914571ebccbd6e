//! Toolkit-agnostic runtime primitives shared by the storefront controllers.
//!
//! Nothing in here knows about OTP codes or wishlists: it provides
//! cancellable task handles, an owned one-second ticker and the persisted
//! key-value slot the controllers read their session tokens from.

mod error;
mod storage;
mod task;
mod ticker;

pub use error::StorageError;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, SharedStore};
pub use task::{TaskHandle, TaskId, TaskSet};
pub use ticker::{Tick, Ticker};
