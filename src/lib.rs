// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod format;
pub mod ndjson;
pub mod observability;
pub mod types;

// Re-exports
pub use client::Client;
pub use error::{Error, Result};
pub use types::*;
