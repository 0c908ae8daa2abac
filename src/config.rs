use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

pub const CONFIG_FILE: &str = "config.json";
pub const GENERATION_CONFIG_FILE: &str = "generation_config.json";

/// The handful of `config.json` fields needed before an architecture is picked.
/// Each model family re-reads the file into its own config type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default, deserialize_with = "truthy")]
    pub is_encoder_decoder: bool,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub eos_token_id: Option<TokenIds>,
    #[serde(default)]
    pub pad_token_id: Option<u32>,
    #[serde(default)]
    pub decoder_start_token_id: Option<u32>,
    #[serde(default)]
    pub max_position_embeddings: Option<usize>,
}

/// Subset of `generation_config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub eos_token_id: Option<TokenIds>,
    #[serde(default)]
    pub decoder_start_token_id: Option<u32>,
}

/// `eos_token_id` is a single id in most configs and a list in newer ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TokenIds {
    One(u32),
    Many(Vec<u32>),
}

impl TokenIds {
    pub fn to_vec(&self) -> Vec<u32> {
        match self {
            Self::One(id) => vec![*id],
            Self::Many(ids) => ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    EncoderDecoder,
    CausalDecoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Text2TextGeneration,
    TextGeneration,
}

impl Architecture {
    pub fn task(self) -> Task {
        match self {
            Self::EncoderDecoder => Task::Text2TextGeneration,
            Self::CausalDecoder => Task::TextGeneration,
        }
    }
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text2TextGeneration => "text2text-generation",
            Self::TextGeneration => "text-generation",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ModelConfig {
    pub fn architecture(&self) -> Architecture {
        if self.is_encoder_decoder {
            Architecture::EncoderDecoder
        } else {
            Architecture::CausalDecoder
        }
    }

    pub fn model_type(&self) -> &str {
        self.model_type.as_deref().unwrap_or("unknown")
    }

    /// EOS ids from `config.json` and `generation_config.json`, deduplicated.
    pub fn stop_tokens(&self, generation: Option<&GenerationConfig>) -> Vec<u32> {
        let mut ids = Vec::new();
        let sources = [
            self.eos_token_id.as_ref(),
            generation.and_then(|g| g.eos_token_id.as_ref()),
        ];
        for id in sources.into_iter().flatten().flat_map(TokenIds::to_vec) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Python-style truthiness for `is_encoder_decoder`, which some exported
/// configs store as `null`, `0` or a string.
fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    })
}

pub fn load_model_config(model_dir: &Path) -> Result<ModelConfig> {
    let path = model_dir.join(CONFIG_FILE);
    let bytes = std::fs::read(&path).with_context(|| format!("read {path:?}"))?;
    let config: ModelConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {path:?}"))?;
    Ok(config)
}

pub fn load_generation_config(model_dir: &Path) -> Result<Option<GenerationConfig>> {
    let path = model_dir.join(GENERATION_CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path).with_context(|| format!("read {path:?}"))?;
    let config = serde_json::from_slice(&bytes).with_context(|| format!("parse {path:?}"))?;
    Ok(Some(config))
}
