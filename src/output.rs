use serde::{Deserialize, Serialize};

/// One generated sequence. Text-generation and text2text pipelines fill
/// `generated_text`; summarization-style outputs use `summary_text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
}

impl Candidate {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            generated_text: Some(text.into()),
            summary_text: None,
        }
    }

    pub fn summary(text: impl Into<String>) -> Self {
        Self {
            generated_text: None,
            summary_text: Some(text.into()),
        }
    }

    /// `generated_text`, then `summary_text`, then empty.
    pub fn text(&self) -> &str {
        self.generated_text
            .as_deref()
            .or(self.summary_text.as_deref())
            .unwrap_or("")
    }
}
