//! Slash-command parsing and rendering for the interactive prompt.
//!
//! A submitted `/...` line is parsed into a typed [`SlashCommand`] here;
//! the interactive loop dispatches on the variant. Parsing never performs
//! side effects, so every command line has exactly one interpretation that
//! can be tested directly.

use serde_json::Value;

use crate::chat::config::SessionConfig;
use crate::types::ShowResponse;

/// Which piece of model information `/show` asked for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShowTarget {
    License,
    Modelfile,
    Parameters,
    System,
    Template,
}

/// Which help screen to print.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HelpTopic {
    General,
    Set,
    Show,
    Parameters,
}

/// A fully parsed slash command.
#[derive(Clone, Debug, PartialEq)]
pub enum SlashCommand {
    SetHistory(bool),
    SetWordWrap(bool),
    SetVerbose(bool),
    SetFormat(String),
    ClearFormat,
    SetParameter { name: String, values: Vec<String> },
    /// Argument text verbatim, multiline delimiter included if present.
    SetSystem(String),
    /// Argument text verbatim, multiline delimiter included if present.
    SetTemplate(String),
    Show(ShowTarget),
    List(Option<String>),
    Help(HelpTopic),
    Bye,
    /// An unrecognized or malformed command, with the message to print.
    Invalid(String),
}

/// Split the first whitespace-delimited token off a line, returning it and
/// the raw remainder with leading whitespace removed.
fn split_first_token(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

/// Parse a slash command line. Returns None when the line is not a command.
pub fn parse_command(line: &str) -> Option<SlashCommand> {
    if !line.starts_with('/') {
        return None;
    }
    let (head, rest) = split_first_token(line);
    let cmd = match head {
        "/bye" | "/exit" => SlashCommand::Bye,
        "/list" => {
            let prefix = rest.split_whitespace().next().map(String::from);
            SlashCommand::List(prefix)
        }
        "/set" => parse_set(rest),
        "/show" => match rest.split_whitespace().next() {
            None => SlashCommand::Help(HelpTopic::Show),
            Some("license") => SlashCommand::Show(ShowTarget::License),
            Some("modelfile") => SlashCommand::Show(ShowTarget::Modelfile),
            Some("parameters") => SlashCommand::Show(ShowTarget::Parameters),
            Some("system") => SlashCommand::Show(ShowTarget::System),
            Some("template") => SlashCommand::Show(ShowTarget::Template),
            Some(other) => SlashCommand::Invalid(format!(
                "Unknown command '/show {other}'. Type /? for help"
            )),
        },
        "/help" | "/?" => match rest.split_whitespace().next() {
            Some("set") | Some("/set") => SlashCommand::Help(HelpTopic::Set),
            Some("show") | Some("/show") => SlashCommand::Help(HelpTopic::Show),
            _ => SlashCommand::Help(HelpTopic::General),
        },
        other => SlashCommand::Invalid(format!("Unknown command '{other}'. Type /? for help")),
    };
    Some(cmd)
}

fn parse_set(rest: &str) -> SlashCommand {
    let (sub, args) = split_first_token(rest);
    match sub {
        "" => SlashCommand::Help(HelpTopic::Set),
        "history" => SlashCommand::SetHistory(true),
        "nohistory" => SlashCommand::SetHistory(false),
        "wordwrap" => SlashCommand::SetWordWrap(true),
        "nowordwrap" => SlashCommand::SetWordWrap(false),
        "verbose" => SlashCommand::SetVerbose(true),
        "quiet" => SlashCommand::SetVerbose(false),
        "format" => {
            if args.split_whitespace().next() == Some("json") {
                SlashCommand::SetFormat("json".to_string())
            } else {
                SlashCommand::Invalid(
                    "Invalid or missing format. For 'json' mode use '/set format json'".to_string(),
                )
            }
        }
        "noformat" => SlashCommand::ClearFormat,
        "parameter" => {
            let (name, value_text) = split_first_token(args);
            let values: Vec<String> = value_text.split_whitespace().map(String::from).collect();
            if name.is_empty() || values.is_empty() {
                SlashCommand::Help(HelpTopic::Parameters)
            } else {
                SlashCommand::SetParameter {
                    name: name.to_string(),
                    values,
                }
            }
        }
        "system" => {
            if args.is_empty() {
                SlashCommand::Help(HelpTopic::Set)
            } else {
                SlashCommand::SetSystem(args.to_string())
            }
        }
        "template" => {
            if args.is_empty() {
                SlashCommand::Help(HelpTopic::Set)
            } else {
                SlashCommand::SetTemplate(args.to_string())
            }
        }
        other => SlashCommand::Invalid(format!("Unknown command '/set {other}'. Type /? for help")),
    }
}

pub fn help_text() -> &'static str {
    "Available Commands:\n\
     \x20 /set         Set session variables\n\
     \x20 /show        Show model information\n\
     \x20 /list        List models on the server\n\
     \x20 /bye         Exit\n\
     \x20 /?, /help    Help for a command\n\
     \n\
     Use \"\"\" to begin a multi-line message.\n"
}

pub fn set_help_text() -> &'static str {
    "Available Commands:\n\
     \x20 /set parameter ...     Set a parameter\n\
     \x20 /set system <string>   Set system prompt\n\
     \x20 /set template <string> Set prompt template\n\
     \x20 /set history           Enable history\n\
     \x20 /set nohistory         Disable history\n\
     \x20 /set wordwrap          Enable wordwrap\n\
     \x20 /set nowordwrap        Disable wordwrap\n\
     \x20 /set format json       Enable JSON mode\n\
     \x20 /set noformat          Disable formatting\n\
     \x20 /set verbose           Show generation stats\n\
     \x20 /set quiet             Disable generation stats\n"
}

pub fn show_help_text() -> &'static str {
    "Available Commands:\n\
     \x20 /show license      Show model license\n\
     \x20 /show modelfile    Show Modelfile for this model\n\
     \x20 /show parameters   Show parameters for this model\n\
     \x20 /show system       Show system prompt\n\
     \x20 /show template     Show prompt template\n"
}

pub fn parameter_help_text() -> &'static str {
    "Available Parameters:\n\
     \x20 /set parameter seed <int>             Random number seed\n\
     \x20 /set parameter num_predict <int>      Max number of tokens to predict\n\
     \x20 /set parameter top_k <int>            Pick from top k num of tokens\n\
     \x20 /set parameter top_p <float>          Pick token based on sum of probabilities\n\
     \x20 /set parameter num_ctx <int>          Set the context size\n\
     \x20 /set parameter temperature <float>    Set creativity level\n\
     \x20 /set parameter repeat_penalty <float> How strongly to penalize repetitions\n\
     \x20 /set parameter repeat_last_n <int>    Set how far back to look for repetitions\n\
     \x20 /set parameter num_gpu <int>          The number of layers to send to the GPU\n\
     \x20 /set parameter stop <string> ...      Set the stop parameters\n"
}

/// Render a JSON parameter value the way a user typed it.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Render the output of a `/show` command.
///
/// Session-level overrides take precedence over what the model defines; the
/// model's own values are shown only when the session has not replaced them.
pub fn show_output(target: ShowTarget, config: &SessionConfig, show: &ShowResponse) -> String {
    match target {
        ShowTarget::License => {
            if show.license.is_empty() {
                "No license was specified for this model.\n".to_string()
            } else {
                show.license.clone()
            }
        }
        ShowTarget::Modelfile => show.modelfile.clone(),
        ShowTarget::Parameters => {
            let mut out = String::new();
            if !config.options.is_empty() {
                out.push_str("User defined parameters:\n");
                for (name, value) in &config.options {
                    out.push_str(&format!("{:<30} {}\n", name, display_value(value)));
                }
                out.push('\n');
            }
            if show.parameters.is_empty() {
                out.push_str("No parameters were specified for this model.\n");
            } else {
                out.push_str("Model defined parameters:\n");
                out.push_str(&show.parameters);
            }
            out
        }
        ShowTarget::System => {
            if !config.system.is_empty() {
                config.system.clone()
            } else if !show.system.is_empty() {
                show.system.clone()
            } else {
                "No system prompt was specified for this model.\n".to_string()
            }
        }
        ShowTarget::Template => {
            if !config.template.is_empty() {
                config.template.clone()
            } else if !show.template.is_empty() {
                show.template.clone()
            } else {
                "No prompt template was specified for this model.\n".to_string()
            }
        }
    }
}
