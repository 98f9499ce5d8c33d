//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! state and drives one streaming generation turn at a time, including
//! rendering, cancellation, and history rollback on failure.

use std::io::{IsTerminal, Write, stdout};
use std::time::Instant;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::chat::config::SessionConfig;
use crate::chat::wrap::WordWrapper;
use crate::client::Client;
use crate::error::Result;
use crate::observability::{TURN_DURATION, TURNS_CANCELLED};
use crate::types::{ChatRequest, ChatResponse, Message, MessageRole};

/// How streamed fragments reach the terminal.
enum TurnPrinter {
    /// Word-wrapped to the terminal width.
    Wrapped(WordWrapper),
    /// Written through unchanged.
    Verbatim,
}

impl TurnPrinter {
    fn print<W: Write>(&mut self, out: &mut W, text: &str) -> Result<()> {
        match self {
            TurnPrinter::Wrapped(wrapper) => wrapper.write(out, text),
            TurnPrinter::Verbatim => {
                write!(out, "{text}")?;
                Ok(())
            }
        }
    }
}

/// A chat session that manages conversation state and server interactions.
///
/// The session maintains message history, snapshots it into a request per
/// turn, and renders the streamed response as it arrives. A failed turn
/// leaves the history exactly as it was before the prompt was submitted; a
/// cancelled turn ends silently.
pub struct ChatSession {
    client: Client,
    config: SessionConfig,
}

impl ChatSession {
    /// Creates a new session from a client and configuration.
    pub fn new(client: Client, config: SessionConfig) -> Self {
        Self { client, config }
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the session configuration for mutation.
    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    /// Returns the client this session talks through.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the model this session converses with.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask the server to load the model without generating anything.
    ///
    /// An empty message list makes the server pull the model into memory and
    /// reply with a single warm-up event, so the first real prompt starts
    /// generating immediately.
    pub async fn load(&mut self) -> Result<()> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            request_id: new_request_id(),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let listener = arm_ctrl_c(&cancel);
        let outcome = self.run_turn(&request, &cancel).await;
        listener.abort();
        outcome?;
        Ok(())
    }

    /// Send one user prompt and stream the response to stdout.
    ///
    /// Ctrl-C during the turn cancels it; the signal listener lives only as
    /// long as the turn so a later Ctrl-C reaches the prompt loop instead.
    pub async fn send_streaming(&mut self, input: &str) -> Result<Option<Message>> {
        let cancel = CancellationToken::new();
        let listener = arm_ctrl_c(&cancel);
        let outcome = self.send_streaming_with_cancel(input, &cancel).await;
        listener.abort();
        outcome
    }

    /// Send one user prompt under a caller-owned cancellation token.
    ///
    /// On success the user prompt and the assistant's reply are appended to
    /// the history and the reply is returned. A cancelled turn returns
    /// `Ok(None)` with the user prompt kept so it can be resubmitted and no
    /// assistant message appended. Any other failure rolls the history back
    /// and propagates the error.
    pub async fn send_streaming_with_cancel(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Message>> {
        if self.config.system_pending {
            self.config.system_pending = false;
            self.config
                .messages
                .push(Message::system(self.config.system.clone()));
        }
        let previous_len = self.config.messages.len();
        self.config.messages.push(Message::user(input));

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.config.messages.clone(),
            format: self.config.format.clone(),
            template: self.config.template.clone(),
            options: self.config.options.clone(),
            request_id: new_request_id(),
        };

        match self.run_turn(&request, cancel).await {
            Ok(Some(reply)) => {
                self.config.messages.push(reply.clone());
                Ok(Some(reply))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.config.messages.truncate(previous_len);
                Err(e)
            }
        }
    }

    /// Run one generation turn.
    ///
    /// Cancellation ends the turn silently; it is not surfaced as an error.
    async fn run_turn(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Message>> {
        let start = Instant::now();
        let outcome = self.consume_stream(request, cancel).await;
        TURN_DURATION.add(start.elapsed().as_secs_f64());

        match outcome {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_cancelled() => {
                TURNS_CANCELLED.click();
                println!();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Stream one response, rendering fragments as they arrive.
    async fn consume_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Message>> {
        let mut printer = self.printer();
        let mut out = stdout();

        let mut full_text = String::new();
        let mut role = MessageRole::Assistant;
        let mut latest: Option<ChatResponse> = None;

        self.client
            .chat(request, cancel, |event| {
                if let Some(message) = &event.message {
                    role = message.role;
                    full_text.push_str(&message.content);
                    printer.print(&mut out, &message.content)?;
                    out.flush()?;
                }
                latest = Some(event);
                Ok(())
            })
            .await?;

        // A warm-up request renders nothing, so skip its spacing too.
        if !request.messages.is_empty() {
            println!();
            println!();
        }

        let Some(latest) = latest else {
            return Ok(None);
        };
        if !latest.done {
            return Ok(None);
        }
        if self.config.verbose {
            eprint!("{}", latest.summary());
        }
        if full_text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Message::new(role, full_text)))
    }

    /// Choose how this turn's fragments get rendered.
    ///
    /// Wrapping requires an interactive stdout whose width is known; pipes
    /// and width-probe failures fall back to verbatim output.
    fn printer(&self) -> TurnPrinter {
        if self.config.word_wrap && stdout().is_terminal() {
            if let Ok((width, _)) = crossterm::terminal::size() {
                return TurnPrinter::Wrapped(WordWrapper::new(width as usize));
            }
        }
        TurnPrinter::Verbatim
    }
}

/// Arm a transient Ctrl-C listener that cancels the given token.
///
/// The returned task must be aborted when the turn ends so a later Ctrl-C
/// reaches the prompt loop instead.
fn arm_ctrl_c(cancel: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

/// Correlation identifier shared by every fragment of one turn.
fn new_request_id() -> String {
    format!(
        "{:x}",
        OffsetDateTime::now_utc().unix_timestamp_nanos() as u128
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_session() -> ChatSession {
        let client = Client::with_host(Some("http://127.0.0.1:1".to_string())).unwrap();
        ChatSession::new(client, SessionConfig::new("test-model"))
    }

    #[test]
    fn request_ids_are_unique() {
        let a = new_request_id();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = new_request_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn cancelled_turn_keeps_prompt_without_reply() {
        let mut session = unreachable_session();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let reply = session
            .send_streaming_with_cancel("hello", &cancel)
            .await
            .unwrap();
        assert!(reply.is_none());

        // The prompt stays so it can be resubmitted; nothing else lands.
        assert_eq!(session.config().messages.len(), 1);
        assert_eq!(session.config().messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn failed_turn_rolls_back_history() {
        let mut session = unreachable_session();
        let err = session.send_streaming("hello").await.unwrap_err();
        assert!(!err.is_cancelled());
        assert!(session.config().messages.is_empty());
    }

    #[tokio::test]
    async fn system_prompt_survives_failed_turn() {
        let mut session = unreachable_session();
        session.config_mut().set_system("Answer briefly.");

        session.send_streaming("hello").await.unwrap_err();
        assert_eq!(session.config().messages.len(), 1);
        assert_eq!(session.config().messages[0].role, MessageRole::System);
        assert!(!session.config().system_pending);

        // A second attempt must not add the system prompt again.
        session.send_streaming("hello again").await.unwrap_err();
        assert_eq!(session.config().messages.len(), 1);
    }

    #[tokio::test]
    async fn config_mutation_flows_into_requests() {
        let mut session = unreachable_session();
        session
            .config_mut()
            .set_parameter("temperature", &["0.7".to_string()])
            .unwrap();
        assert_eq!(
            session.config().options["temperature"],
            serde_json::json!(0.7)
        );
    }
}
