use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::{
    gemma, gemma2, llama, mistral, mixtral, phi, phi3, qwen2, qwen3, stable_lm, starcoder2,
};

use crate::Runtime;
use crate::generate::Decoder;
use crate::model::{read_family_config, read_family_config_or};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Llama,
    Mistral,
    Mixtral,
    Phi,
    Phi3,
    Gemma,
    Gemma2,
    Qwen2,
    Qwen3,
    StableLm,
    Starcoder2,
}

/// `model_type` values handled by [`CausalLm`].
pub const FAMILIES: &[(&str, Family)] = &[
    ("llama", Family::Llama),
    ("mistral", Family::Mistral),
    ("mixtral", Family::Mixtral),
    ("phi", Family::Phi),
    ("phi3", Family::Phi3),
    ("gemma", Family::Gemma),
    ("gemma2", Family::Gemma2),
    ("qwen2", Family::Qwen2),
    ("qwen3", Family::Qwen3),
    ("stablelm", Family::StableLm),
    ("starcoder2", Family::Starcoder2),
];

enum Inner {
    Llama {
        model: llama::Llama,
        cache: llama::Cache,
        config: llama::Config,
    },
    Mistral(mistral::Model),
    // mixtral and stablelm keep no clearable cache, so a reset rebuilds them
    Mixtral {
        model: mixtral::Model,
        config: mixtral::Config,
        vb: VarBuilder<'static>,
    },
    Phi(phi::Model),
    Phi3(phi3::Model),
    Gemma(gemma::Model),
    Gemma2(gemma2::Model),
    Qwen2(qwen2::ModelForCausalLM),
    Qwen3(qwen3::ModelForCausalLM),
    StableLm {
        model: stable_lm::Model,
        config: stable_lm::Config,
        vb: VarBuilder<'static>,
    },
    Starcoder2(starcoder2::Model),
}

/// Decoder-only language model with its KV cache.
pub struct CausalLm {
    inner: Inner,
    device: Device,
    dtype: DType,
    stepped: bool,
}

impl CausalLm {
    pub fn load(
        family: Family,
        model_dir: &Path,
        vb: VarBuilder<'static>,
        rt: &Runtime,
    ) -> Result<Self> {
        let inner = match family {
            Family::Llama => {
                let cfg: llama::LlamaConfig = read_family_config(model_dir)?;
                let cfg = cfg.into_config(false);
                let model = llama::Llama::load(vb, &cfg).context("build llama")?;
                let cache = llama::Cache::new(true, rt.dtype, &cfg, &rt.device)
                    .context("allocate llama cache")?;
                Inner::Llama {
                    model,
                    cache,
                    config: cfg,
                }
            }
            Family::Mistral => {
                let cfg: mistral::Config = read_family_config(model_dir)?;
                Inner::Mistral(mistral::Model::new(&cfg, vb).context("build mistral")?)
            }
            Family::Mixtral => {
                let cfg: mixtral::Config = read_family_config_or(
                    model_dir,
                    &[("use_flash_attn", serde_json::Value::Bool(false))],
                )?;
                let model = mixtral::Model::new(&cfg, vb.clone()).context("build mixtral")?;
                Inner::Mixtral {
                    model,
                    config: cfg,
                    vb,
                }
            }
            Family::Phi => {
                let cfg: phi::Config = read_family_config(model_dir)?;
                Inner::Phi(phi::Model::new(&cfg, vb).context("build phi")?)
            }
            Family::Phi3 => {
                let cfg: phi3::Config = read_family_config(model_dir)?;
                Inner::Phi3(phi3::Model::new(&cfg, vb).context("build phi3")?)
            }
            Family::Gemma => {
                let cfg: gemma::Config = read_family_config(model_dir)?;
                Inner::Gemma(gemma::Model::new(false, &cfg, vb).context("build gemma")?)
            }
            Family::Gemma2 => {
                let cfg: gemma2::Config = read_family_config(model_dir)?;
                Inner::Gemma2(gemma2::Model::new(false, &cfg, vb).context("build gemma2")?)
            }
            Family::Qwen2 => {
                let cfg: qwen2::Config = read_family_config(model_dir)?;
                Inner::Qwen2(qwen2::ModelForCausalLM::new(&cfg, vb).context("build qwen2")?)
            }
            Family::Qwen3 => {
                let cfg: qwen3::Config = read_family_config(model_dir)?;
                Inner::Qwen3(qwen3::ModelForCausalLM::new(&cfg, vb).context("build qwen3")?)
            }
            Family::StableLm => {
                let cfg: stable_lm::Config = read_family_config(model_dir)?;
                let model = stable_lm::Model::new(&cfg, vb.clone()).context("build stablelm")?;
                Inner::StableLm {
                    model,
                    config: cfg,
                    vb,
                }
            }
            Family::Starcoder2 => {
                let cfg: starcoder2::Config = read_family_config(model_dir)?;
                Inner::Starcoder2(starcoder2::Model::new(&cfg, vb).context("build starcoder2")?)
            }
        };
        Ok(Self {
            inner,
            device: rt.device.clone(),
            dtype: rt.dtype,
            stepped: false,
        })
    }

    /// Drops cached keys and values so the next step starts at position 0.
    pub fn reset(&mut self) -> Result<()> {
        if !self.stepped {
            return Ok(());
        }
        match &mut self.inner {
            Inner::Llama { cache, config, .. } => {
                *cache = llama::Cache::new(true, self.dtype, config, &self.device)
                    .context("reallocate llama cache")?;
            }
            Inner::Mistral(model) => model.clear_kv_cache(),
            Inner::Mixtral { model, config, vb } => {
                *model = mixtral::Model::new(config, vb.clone()).context("rebuild mixtral")?;
            }
            Inner::Phi(model) => model.clear_kv_cache(),
            Inner::Phi3(model) => model.clear_kv_cache(),
            Inner::Gemma(model) => model.clear_kv_cache(),
            Inner::Gemma2(model) => model.clear_kv_cache(),
            Inner::Qwen2(model) => model.clear_kv_cache(),
            Inner::Qwen3(model) => model.clear_kv_cache(),
            Inner::StableLm { model, config, vb } => {
                *model = stable_lm::Model::new(config, vb.clone()).context("rebuild stablelm")?;
            }
            Inner::Starcoder2(model) => model.clear_kv_cache(),
        }
        self.stepped = false;
        Ok(())
    }
}

impl Decoder for CausalLm {
    fn step(&mut self, tokens: &[u32], offset: usize) -> Result<Tensor> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        self.stepped = true;
        let logits = match &mut self.inner {
            Inner::Llama { model, cache, .. } => model.forward(&input, offset, cache)?,
            Inner::Mistral(model) => model.forward(&input, offset)?,
            Inner::Mixtral { model, .. } => model.forward(&input, offset)?,
            // phi tracks its own position
            Inner::Phi(model) => model.forward(&input)?,
            Inner::Phi3(model) => model.forward(&input, offset)?,
            Inner::Gemma(model) => model.forward(&input, offset)?,
            Inner::Gemma2(model) => model.forward(&input, offset)?,
            Inner::Qwen2(model) => model.forward(&input, offset)?,
            Inner::Qwen3(model) => model.forward(&input, offset)?,
            Inner::StableLm { model, .. } => model.forward(&input, offset)?,
            Inner::Starcoder2(model) => model.forward(&input, offset)?,
        };
        Ok(logits)
    }
}

pub fn family(model_type: &str) -> Option<Family> {
    FAMILIES
        .iter()
        .find(|(name, _)| *name == model_type)
        .map(|(_, family)| *family)
}
