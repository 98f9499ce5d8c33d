//! Configuration types for the interactive runner.
//!
//! This module provides CLI argument parsing via `arrrg` and the session
//! state that slash commands mutate between turns.

use arrrg_derive::CommandLine;
use serde_json::{Map, Value};

use crate::Result;
use crate::types::{Message, coerce_parameter};

/// Command-line arguments for the quill-run tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Base URL of the model server.
    #[arrrg(optional, "Model server to connect to (default: $QUILL_HOST)", "HOST")]
    pub host: Option<String>,

    /// Response format constraint.
    #[arrrg(optional, "Response format (\"json\")", "FORMAT")]
    pub format: Option<String>,

    /// Disable word wrapping of streamed output.
    #[arrrg(flag, "Don't wrap words to the next line automatically")]
    pub nowordwrap: bool,

    /// Print timing statistics after each response.
    #[arrrg(flag, "Show timings for each response")]
    pub verbose: bool,
}

/// Mutable state of one interactive session.
///
/// This is the conversation so far plus every setting a slash command can
/// change. A snapshot of it becomes each turn's request.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The model to converse with.
    pub model: String,

    /// The conversation history, oldest first.
    pub messages: Vec<Message>,

    /// Whether to word-wrap streamed output to the terminal width.
    pub word_wrap: bool,

    /// Response format constraint; empty means unconstrained.
    pub format: String,

    /// Prompt template override; empty means the model's default.
    pub template: String,

    /// Session system prompt; empty means the model's default.
    pub system: String,

    /// Set when a new system prompt has not yet been added to the history.
    pub system_pending: bool,

    /// Generation options set with `/set parameter`.
    pub options: Map<String, Value>,

    /// Whether to print timing statistics after each response.
    pub verbose: bool,

    /// Whether submitted prompts are added to readline history.
    pub history: bool,
}

impl SessionConfig {
    /// Creates a session for the given model with default settings.
    pub fn new(model: impl Into<String>) -> Self {
        SessionConfig {
            model: model.into(),
            messages: Vec::new(),
            word_wrap: true,
            format: String::new(),
            template: String::new(),
            system: String::new(),
            system_pending: false,
            options: Map::new(),
            verbose: false,
            history: true,
        }
    }

    /// Replace the session system prompt.
    ///
    /// The new prompt is marked pending so the next turn inserts it into the
    /// conversation history.
    pub fn set_system(&mut self, text: impl Into<String>) {
        self.system = text.into();
        self.system_pending = !self.system.is_empty();
    }

    /// Set a generation option from its command-line string values.
    ///
    /// The value is coerced to the parameter's declared type; unknown names
    /// and unparsable values are validation errors.
    pub fn set_parameter(&mut self, name: &str, values: &[String]) -> Result<()> {
        let value = coerce_parameter(name, values)?;
        self.options.insert(name.to_string(), value);
        Ok(())
    }
}
