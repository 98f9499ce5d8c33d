use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::format::{human_bytes, human_time};

/// One entry in the server's model list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// The model name, including any tag.
    pub name: String,

    /// Content digest of the model, if known.
    #[serde(default)]
    pub digest: String,

    /// On-disk size of the model in bytes.
    #[serde(default)]
    pub size: u64,

    /// When the model was last modified.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
}

/// Response from the model-listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListResponse {
    /// The models available on the server.
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

impl ListResponse {
    /// Renders the model list as an aligned table, optionally filtered by
    /// name prefix. The header is included; each row shows the name, a
    /// truncated digest, a human-readable size, and a relative modified time.
    pub fn render_table(&self, prefix: Option<&str>) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<40} {:<16} {:<12} {}\n",
            "NAME", "ID", "SIZE", "MODIFIED"
        ));
        for model in &self.models {
            if let Some(prefix) = prefix {
                if !model.name.starts_with(prefix) {
                    continue;
                }
            }
            let digest = model.digest.get(..12).unwrap_or(&model.digest);
            out.push_str(&format!(
                "{:<40} {:<16} {:<12} {}\n",
                model.name,
                digest,
                human_bytes(model.size),
                human_time(model.modified_at, "Never"),
            ));
        }
        out
    }
}

/// Request body for the model-metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRequest {
    /// The model to describe.
    pub name: String,
}

/// Model metadata returned by the server.
///
/// All fields default to empty; the caller decides how to present missing
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShowResponse {
    /// The model's license text.
    #[serde(default)]
    pub license: String,

    /// The full modelfile the model was built from.
    #[serde(default)]
    pub modelfile: String,

    /// The model's default generation parameters, one per line.
    #[serde(default)]
    pub parameters: String,

    /// The model's default system prompt.
    #[serde(default)]
    pub system: String,

    /// The model's default prompt template.
    #[serde(default)]
    pub template: String,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn models() -> ListResponse {
        ListResponse {
            models: vec![
                ModelSummary {
                    name: "greeter:latest".to_string(),
                    digest: "sha256abcdef012345".to_string(),
                    size: 4_100_000_000,
                    modified_at: Some(datetime!(2024-01-01 00:00:00 UTC)),
                },
                ModelSummary {
                    name: "coder:7b".to_string(),
                    digest: "0123456789abcdef".to_string(),
                    size: 3_800_000_000,
                    modified_at: None,
                },
            ],
        }
    }

    #[test]
    fn table_contains_all_models() {
        let table = models().render_table(None);
        assert!(table.starts_with("NAME"));
        assert!(table.contains("greeter:latest"));
        assert!(table.contains("coder:7b"));
        assert!(table.contains("sha256abcdef"));
        assert!(table.contains("Never"));
    }

    #[test]
    fn table_filters_by_prefix() {
        let table = models().render_table(Some("greeter"));
        assert!(table.contains("greeter:latest"));
        assert!(!table.contains("coder:7b"));
    }

    #[test]
    fn show_response_defaults_empty() {
        let resp: ShowResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.license.is_empty());
        assert!(resp.template.is_empty());
    }

    #[test]
    fn list_parses_missing_digest() {
        let json = r#"{"models":[{"name":"tiny","size":12}]}"#;
        let resp: ListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.models[0].name, "tiny");
        assert!(resp.models[0].digest.is_empty());
        assert!(resp.models[0].modified_at.is_none());
    }
}
