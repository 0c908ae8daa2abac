//! Model families, all provided by `candle-transformers`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Runtime;
use crate::config::{Architecture, CONFIG_FILE, ModelConfig};
use crate::loader;

pub mod causal;
pub mod seq2seq;

pub use causal::CausalLm;
pub use seq2seq::Seq2SeqLm;

pub enum Model {
    Causal(CausalLm),
    Seq2Seq(Seq2SeqLm),
}

/// A `model_type` resolved for one architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Causal(causal::Family),
    Seq2Seq(seq2seq::Family),
}

/// Reads `config.json` again, into the family's own config type.
pub(crate) fn read_family_config<T: DeserializeOwned>(model_dir: &Path) -> Result<T> {
    read_family_config_or(model_dir, &[])
}

/// Like [`read_family_config`], filling in `defaults` for keys the file lacks.
pub(crate) fn read_family_config_or<T: DeserializeOwned>(
    model_dir: &Path,
    defaults: &[(&str, serde_json::Value)],
) -> Result<T> {
    let path = model_dir.join(CONFIG_FILE);
    let bytes = std::fs::read(&path).with_context(|| format!("read {path:?}"))?;
    let mut value: serde_json::Value =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {path:?}"))?;
    if let Some(object) = value.as_object_mut() {
        for (key, default) in defaults {
            object
                .entry(key.to_string())
                .or_insert_with(|| default.clone());
        }
    }
    serde_json::from_value(value)
        .with_context(|| format!("parse {path:?} as {}", std::any::type_name::<T>()))
}

pub fn supported_model_types(architecture: Architecture) -> Vec<&'static str> {
    match architecture {
        Architecture::EncoderDecoder => seq2seq::FAMILIES.iter().map(|(name, _)| *name).collect(),
        Architecture::CausalDecoder => causal::FAMILIES.iter().map(|(name, _)| *name).collect(),
    }
}

/// Picks the family for `model_type`, failing before any weight is touched
/// when none handles it.
pub fn resolve_family(architecture: Architecture, model_type: &str) -> Result<Family> {
    let family = match architecture {
        Architecture::EncoderDecoder => seq2seq::family(model_type).map(Family::Seq2Seq),
        Architecture::CausalDecoder => causal::family(model_type).map(Family::Causal),
    };
    match family {
        Some(family) => Ok(family),
        None => bail!(
            "unsupported {} model_type {model_type:?} (supported: {})",
            architecture.task(),
            supported_model_types(architecture).join(", ")
        ),
    }
}

impl Model {
    /// Loads weights for the architecture `config` declares.
    pub fn load(config: &ModelConfig, model_dir: &Path, rt: &Runtime) -> Result<Self> {
        let family = resolve_family(config.architecture(), config.model_type())?;

        let files = loader::find_weights(model_dir)?;
        debug!(?family, ?files, "weights");
        let vb = loader::var_builder(&files, rt)?;
        match family {
            Family::Seq2Seq(family) => {
                Seq2SeqLm::load(family, model_dir, vb, &rt.device).map(Self::Seq2Seq)
            }
            Family::Causal(family) => CausalLm::load(family, model_dir, vb, rt).map(Self::Causal),
        }
    }
}
