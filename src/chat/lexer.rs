//! Line classification for the interactive prompt.
//!
//! Each submitted line is either a slash command, part of a multiline block
//! delimited by `"""`, or a complete prompt. The lexer is a small state
//! machine fed one line at a time; pasted input bypasses delimiter and
//! command recognition entirely.

/// Delimiter opening and closing a multiline block.
pub const MULTILINE_DELIM: &str = "\"\"\"";

/// What kind of input the lexer is currently accumulating.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LexerState {
    /// Not inside a multiline block.
    Idle,
    /// Inside a `"""` block that will become a prompt.
    Prompt,
    /// Inside a `"""` block that will become the system prompt.
    System,
    /// Inside a `"""` block that will become the prompt template.
    Template,
}

/// What a multiline capture opened by a command is for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaptureKind {
    /// Capturing a system prompt for `/set system`.
    System,
    /// Capturing a prompt template for `/set template`.
    Template,
}

/// Result of offering command text to [`LineLexer::open_capture`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaptureOutcome {
    /// The text was fully delimited on one line; here is its content.
    Complete(String),
    /// A multiline block was opened; subsequent lines feed it.
    Opened,
}

/// What the lexer decided about a submitted line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineEvent {
    /// The line is a slash command, returned verbatim.
    Command(String),
    /// A complete prompt is ready to send.
    PromptReady(String),
    /// A multiline system-prompt block just closed with this content.
    SetSystem(String),
    /// A multiline template block just closed with this content.
    SetTemplate(String),
    /// More lines are needed before anything can happen.
    Continuing,
}

/// State machine classifying prompt lines.
pub struct LineLexer {
    state: LexerState,
    buffer: Vec<String>,
}

impl Default for LineLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineLexer {
    pub fn new() -> Self {
        LineLexer {
            state: LexerState::Idle,
            buffer: Vec::new(),
        }
    }

    /// The current lexer state.
    pub fn state(&self) -> LexerState {
        self.state
    }

    /// True when a multiline block or pasted input is still accumulating.
    pub fn is_accumulating(&self) -> bool {
        self.state != LexerState::Idle || !self.buffer.is_empty()
    }

    /// Discard any partial input and return to the idle state.
    pub fn reset(&mut self) {
        self.state = LexerState::Idle;
        self.buffer.clear();
    }

    fn take_buffer(&mut self) -> String {
        let text = self.buffer.join("\n");
        self.buffer.clear();
        text
    }

    /// Feed one submitted line to the lexer.
    ///
    /// `pasting` marks lines that arrived as part of a paste; they accumulate
    /// verbatim without delimiter or command recognition. Commands are only
    /// recognized on an otherwise empty buffer in the idle state.
    pub fn feed(&mut self, line: &str, pasting: bool) -> LineEvent {
        if pasting {
            self.buffer.push(line.to_string());
            return LineEvent::Continuing;
        }

        match self.state {
            LexerState::Idle => {
                if let Some(rest) = line.strip_prefix(MULTILINE_DELIM) {
                    if self.buffer.is_empty() {
                        self.buffer.push(rest.to_string());
                        self.state = LexerState::Prompt;
                        return LineEvent::Continuing;
                    }
                }
                if line.starts_with('/') && self.buffer.is_empty() {
                    return LineEvent::Command(line.to_string());
                }
                self.buffer.push(line.to_string());
                LineEvent::PromptReady(self.take_buffer())
            }
            LexerState::Prompt | LexerState::System | LexerState::Template => {
                if let Some(cut) = line.strip_suffix(MULTILINE_DELIM) {
                    self.buffer.push(cut.to_string());
                    let text = self.take_buffer();
                    let state = self.state;
                    self.state = LexerState::Idle;
                    match state {
                        LexerState::Prompt => LineEvent::PromptReady(text),
                        LexerState::System => LineEvent::SetSystem(text),
                        LexerState::Template => LineEvent::SetTemplate(text),
                        LexerState::Idle => unreachable!(),
                    }
                } else {
                    self.buffer.push(line.to_string());
                    LineEvent::Continuing
                }
            }
        }
    }

    /// Begin capturing multiline command text that opened with `"""`.
    ///
    /// `text` is the argument of a `/set system` or `/set template` command,
    /// delimiter included. When the closing delimiter is on the same line the
    /// content is returned immediately.
    pub fn open_capture(&mut self, kind: CaptureKind, text: &str) -> CaptureOutcome {
        let rest = text.strip_prefix(MULTILINE_DELIM).unwrap_or(text);
        if let Some(cut) = rest.strip_suffix(MULTILINE_DELIM) {
            return CaptureOutcome::Complete(cut.to_string());
        }
        self.buffer.push(rest.to_string());
        self.state = match kind {
            CaptureKind::System => LexerState::System,
            CaptureKind::Template => LexerState::Template,
        };
        CaptureOutcome::Opened
    }
}
