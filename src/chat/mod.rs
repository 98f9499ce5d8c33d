//! Interactive chat support.
//!
//! Everything the `quill-run` binary needs that is not the wire protocol:
//! session state and turn execution, line lexing for multiline input and
//! pasted text, slash-command parsing, and streaming word wrap.

mod commands;
mod config;
mod lexer;
mod session;
mod wrap;

pub use commands::{
    HelpTopic, ShowTarget, SlashCommand, help_text, parameter_help_text, parse_command,
    set_help_text, show_help_text, show_output,
};
pub use config::{RunArgs, SessionConfig};
pub use lexer::{
    CaptureKind, CaptureOutcome, LexerState, LineEvent, LineLexer, MULTILINE_DELIM,
};
pub use session::ChatSession;
pub use wrap::WordWrapper;
