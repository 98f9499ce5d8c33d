//! quill-run: interactive terminal client for a model server.
//!
//! Usage: quill-run [OPTIONS] MODEL [PROMPT...]
//!
//! With a PROMPT (or piped stdin) the response is streamed once and the
//! process exits. Without one an interactive prompt loop starts, supporting
//! `"""` multiline blocks and slash commands (`/?` lists them). Ctrl-C
//! cancels the turn in flight; Ctrl-D or /bye exits.

use std::io::{IsTerminal, Read, stdin};
use std::process;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use quill::chat::{
    CaptureKind, CaptureOutcome, ChatSession, HelpTopic, LineEvent, LineLexer, MULTILINE_DELIM,
    RunArgs, SessionConfig, SlashCommand, help_text, parameter_help_text,
    parse_command, set_help_text, show_help_text, show_output,
};
use quill::{Client, Error};

const USAGE: &str = "quill-run [OPTIONS] MODEL [PROMPT...]";

/// Main entry point for the quill-run application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = RunArgs::from_command_line_relaxed(USAGE);

    let Some((model, prompt_words)) = free.split_first() else {
        eprintln!("Usage: {USAGE}");
        process::exit(1);
    };

    if let Some(format) = &args.format {
        if format != "json" {
            eprintln!("invalid format '{format}'; only 'json' is supported");
            process::exit(1);
        }
    }

    let client = Client::with_host(args.host.clone())?;
    if let Err(e) = client.heartbeat().await {
        if e.is_connection() {
            eprintln!("could not connect to the model server; is it running?");
        }
        return Err(e.into());
    }

    let mut config = SessionConfig::new(model.clone());
    config.word_wrap = !args.nowordwrap;
    config.verbose = args.verbose;
    if let Some(format) = args.format {
        config.format = format;
    }

    let mut prompt = prompt_words.join(" ");

    // Piped input becomes part of a single one-shot prompt.
    if !stdin().is_terminal() {
        let mut piped = String::new();
        stdin().read_to_string(&mut piped)?;
        if !prompt.is_empty() {
            prompt.push(' ');
        }
        prompt.push_str(&piped);
        config.word_wrap = false;
    }

    let mut session = ChatSession::new(client, config);

    if !prompt.trim().is_empty() {
        session.send_streaming(&prompt).await?;
        return Ok(());
    }

    run_interactive(&mut session).await
}

/// The interactive prompt loop.
async fn run_interactive(session: &mut ChatSession) -> Result<(), Box<dyn std::error::Error>> {
    session.load().await?;

    let mut rl = DefaultEditor::new()?;
    let mut lexer = LineLexer::new();

    loop {
        let prompt = if lexer.is_accumulating() {
            "... "
        } else {
            ">>> "
        };
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if !lexer.is_accumulating() {
                    println!("\nUse Ctrl-D or /bye to exit.");
                }
                lexer.reset();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if session.config().history && !line.trim().is_empty() {
            let _ = rl.add_history_entry(line.as_str());
        }

        // A bracketed paste arrives as one string; every line but the last
        // accumulates without delimiter or command recognition.
        let parts: Vec<&str> = line.split('\n').collect();
        let (last, pasted) = parts.split_last().unwrap_or((&"", &[]));
        for part in pasted {
            lexer.feed(part, true);
        }

        match lexer.feed(last, false) {
            LineEvent::Continuing => {}
            LineEvent::Command(command) => {
                let Some(command) = parse_command(&command) else {
                    continue;
                };
                if dispatch_command(session, &mut lexer, command).await? {
                    return Ok(());
                }
            }
            LineEvent::SetSystem(text) => {
                session.config_mut().set_system(text);
                println!("Set system prompt.\n");
            }
            LineEvent::SetTemplate(text) => {
                session.config_mut().template = text;
                println!("Set prompt template.\n");
            }
            LineEvent::PromptReady(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                session.send_streaming(&text).await?;
            }
        }
    }
}

/// Execute one parsed slash command. Returns true when the session should end.
async fn dispatch_command(
    session: &mut ChatSession,
    lexer: &mut LineLexer,
    command: SlashCommand,
) -> Result<bool, Error> {
    match command {
        SlashCommand::Bye => return Ok(true),
        SlashCommand::SetHistory(enabled) => {
            session.config_mut().history = enabled;
        }
        SlashCommand::SetWordWrap(enabled) => {
            session.config_mut().word_wrap = enabled;
            if enabled {
                println!("Set 'wordwrap' mode.");
            } else {
                println!("Set 'nowordwrap' mode.");
            }
        }
        SlashCommand::SetVerbose(enabled) => {
            session.config_mut().verbose = enabled;
            if enabled {
                println!("Set 'verbose' mode.");
            } else {
                println!("Set 'quiet' mode.");
            }
        }
        SlashCommand::SetFormat(format) => {
            println!("Set format to '{format}' mode.");
            session.config_mut().format = format;
        }
        SlashCommand::ClearFormat => {
            session.config_mut().format.clear();
            println!("Disabled format.");
        }
        SlashCommand::SetParameter { name, values } => {
            match session.config_mut().set_parameter(&name, &values) {
                Ok(()) => {
                    println!("Set parameter '{}' to '{}'\n", name, values.join(", "));
                }
                Err(e) => {
                    println!("Couldn't set parameter: {e}\n");
                }
            }
        }
        SlashCommand::SetSystem(text) => {
            if text.starts_with(MULTILINE_DELIM) {
                match lexer.open_capture(CaptureKind::System, &text) {
                    CaptureOutcome::Complete(content) => {
                        session.config_mut().set_system(content);
                        println!("Set system prompt.\n");
                    }
                    CaptureOutcome::Opened => {}
                }
            } else {
                session.config_mut().set_system(text);
                println!("Set system prompt.\n");
            }
        }
        SlashCommand::SetTemplate(text) => {
            if text.starts_with(MULTILINE_DELIM) {
                match lexer.open_capture(CaptureKind::Template, &text) {
                    CaptureOutcome::Complete(content) => {
                        session.config_mut().template = content;
                        println!("Set prompt template.\n");
                    }
                    CaptureOutcome::Opened => {}
                }
            } else {
                session.config_mut().template = text;
                println!("Set prompt template.\n");
            }
        }
        SlashCommand::Show(target) => {
            let show = session.client().show(session.model()).await?;
            print!("{}", ensure_trailing_newline(show_output(target, session.config(), &show)));
        }
        SlashCommand::List(prefix) => {
            let models = session.client().list().await?;
            print!("{}", models.render_table(prefix.as_deref()));
        }
        SlashCommand::Help(HelpTopic::General) => eprint!("{}", help_text()),
        SlashCommand::Help(HelpTopic::Set) => eprint!("{}", set_help_text()),
        SlashCommand::Help(HelpTopic::Show) => eprint!("{}", show_help_text()),
        SlashCommand::Help(HelpTopic::Parameters) => eprint!("{}", parameter_help_text()),
        SlashCommand::Invalid(message) => println!("{message}"),
    }
    Ok(false)
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
