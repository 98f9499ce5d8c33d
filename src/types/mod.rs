// Public modules
pub mod chat;
pub mod message;
pub mod model;
pub mod options;

// Re-exports
pub use chat::{ChatRequest, ChatResponse};
pub use message::{Message, MessageRole};
pub use model::{ListResponse, ModelSummary, ShowRequest, ShowResponse};
pub use options::{ParameterKind, coerce_parameter, parameter_kind};
