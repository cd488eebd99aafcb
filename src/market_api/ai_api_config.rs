use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl GeminiConfig {
    /// `{endpoint}/{model}:generateContent?key=...`
    pub fn generate_content_url(&self, api_key: &str) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(&map_gemini_model(&self.model)),
            urlencoding::encode(api_key)
        )
    }
}

/// Accepts `gemini:<name>`, a bare `gemini`, or a full model name.
pub fn map_gemini_model(model: &str) -> String {
    let name = model.trim();
    let name = name.strip_prefix("gemini:").unwrap_or(name);
    match name {
        "" | "gemini" => DEFAULT_GEMINI_MODEL.to_string(),
        "gemini-pro" => "gemini-2.5-flash".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_gemini_model() {
        assert_eq!(map_gemini_model("gemini:gemini-2.5-pro"), "gemini-2.5-pro");
        assert_eq!(map_gemini_model("gemini"), DEFAULT_GEMINI_MODEL);
        assert_eq!(map_gemini_model("gemini-pro"), "gemini-2.5-flash");
        assert_eq!(map_gemini_model("gemini-3-flash-preview"), "gemini-3-flash-preview");
    }

    #[test]
    fn test_generate_content_url_encodes_key() {
        let config = GeminiConfig {
            endpoint: "https://example.test/v1beta/models/".to_string(),
            model: "gemini:gemini-2.5-flash".to_string(),
            api_key: None,
        };
        assert_eq!(
            config.generate_content_url("a b&c"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent?key=a%20b%26c"
        );
    }
}
