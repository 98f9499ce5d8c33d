use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::format::human_duration;
use crate::types::Message;

/// Parameters for one generation turn.
///
/// The request carries a snapshot of the session: the full message history,
/// the response-format hint, the active template override, and the
/// generation options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to generate with.
    pub model: String,

    /// The full conversation history for this turn.
    pub messages: Vec<Message>,

    /// Response format hint ("json"); empty means none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,

    /// Prompt template override; empty means the model's default.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,

    /// Generation options (temperature, top_k, stop, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    /// Correlation identifier for this turn.
    ///
    /// Generated once when the turn starts and constant for every fragment
    /// of the turn.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
}

/// One partial-response event from the server.
///
/// The server streams one of these per generated fragment, plus a final
/// event with `done == true` carrying timing information. An event with no
/// `message` is a warm-up signal, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model that produced this event.
    pub model: String,

    /// When the server produced this event.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// The fragment payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// True on the final event of a turn.
    #[serde(default)]
    pub done: bool,

    /// Wall-clock duration of the whole turn, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    /// Time spent loading the model, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    /// Number of tokens in the evaluated prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    /// Time spent evaluating the prompt, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    /// Number of generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    /// Time spent generating, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl ChatResponse {
    /// Renders the timing/throughput summary for a completed turn.
    ///
    /// Only fields present on the final event are included. The returned
    /// string ends with a newline when non-empty.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let Some(d) = self.total_duration {
            let _ = writeln!(out, "total duration:       {}", human_duration(d));
        }
        if let Some(d) = self.load_duration {
            let _ = writeln!(out, "load duration:        {}", human_duration(d));
        }
        if let Some(n) = self.prompt_eval_count {
            let _ = writeln!(out, "prompt eval count:    {n} token(s)");
        }
        if let Some(d) = self.prompt_eval_duration {
            let _ = writeln!(out, "prompt eval duration: {}", human_duration(d));
        }
        if let (Some(n), Some(d)) = (self.prompt_eval_count, self.prompt_eval_duration) {
            if d > 0 {
                let rate = n as f64 / (d as f64 / 1e9);
                let _ = writeln!(out, "prompt eval rate:     {rate:.2} tokens/s");
            }
        }
        if let Some(n) = self.eval_count {
            let _ = writeln!(out, "eval count:           {n} token(s)");
        }
        if let Some(d) = self.eval_duration {
            let _ = writeln!(out, "eval duration:        {}", human_duration(d));
        }
        if let (Some(n), Some(d)) = (self.eval_count, self.eval_duration) {
            if d > 0 {
                let rate = n as f64 / (d as f64 / 1e9);
                let _ = writeln!(out, "eval rate:            {rate:.2} tokens/s");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn response() -> ChatResponse {
        ChatResponse {
            model: "greeter".to_string(),
            created_at: datetime!(2024-01-05 12:00:00 UTC),
            message: None,
            done: true,
            total_duration: Some(2_000_000_000),
            load_duration: Some(5_000_000),
            prompt_eval_count: Some(10),
            prompt_eval_duration: Some(500_000_000),
            eval_count: Some(40),
            eval_duration: Some(1_000_000_000),
        }
    }

    #[test]
    fn request_skips_empty_fields() {
        let request = ChatRequest {
            model: "greeter".to_string(),
            messages: vec![Message::user("hi")],
            format: String::new(),
            template: String::new(),
            options: Map::new(),
            request_id: "ab12".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("format"));
        assert!(!json.contains("template"));
        assert!(!json.contains("options"));
        assert!(json.contains("\"request_id\":\"ab12\""));
    }

    #[test]
    fn response_parses_warm_up_event() {
        let json = r#"{"model":"greeter","created_at":"2024-01-05T12:00:00Z","done":true}"#;
        let event: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(event.message.is_none());
        assert!(event.done);
    }

    #[test]
    fn response_parses_fragment() {
        let json = r#"{"model":"greeter","created_at":"2024-01-05T12:00:00Z","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        let event: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(event.message.unwrap(), Message::assistant("Hel"));
        assert!(!event.done);
    }

    #[test]
    fn summary_includes_rates() {
        let summary = response().summary();
        assert!(summary.contains("total duration:       2.000s"));
        assert!(summary.contains("prompt eval rate:     20.00 tokens/s"));
        assert!(summary.contains("eval rate:            40.00 tokens/s"));
    }

    #[test]
    fn summary_empty_when_no_timings() {
        let mut event = response();
        event.total_duration = None;
        event.load_duration = None;
        event.prompt_eval_count = None;
        event.prompt_eval_duration = None;
        event.eval_count = None;
        event.eval_duration = None;
        assert!(event.summary().is_empty());
    }
}
