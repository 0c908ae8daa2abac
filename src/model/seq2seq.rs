use std::path::Path;

use anyhow::{Context, Result, bail};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::{marian, t5};

use crate::generate::Decoder;
use crate::model::read_family_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    T5,
    Marian,
}

/// `model_type` values handled by [`Seq2SeqLm`].
pub const FAMILIES: &[(&str, Family)] = &[
    ("t5", Family::T5),
    ("mt5", Family::T5),
    ("marian", Family::Marian),
];

enum Inner {
    T5(t5::T5ForConditionalGeneration),
    Marian(marian::MTModel),
}

/// Encoder-decoder model. [`Seq2SeqLm::encode`] must run before the first
/// [`Decoder::step`].
pub struct Seq2SeqLm {
    inner: Inner,
    encoder_output: Option<Tensor>,
    device: Device,
}

impl Seq2SeqLm {
    pub fn load(family: Family, model_dir: &Path, vb: VarBuilder, device: &Device) -> Result<Self> {
        let inner = match family {
            Family::T5 => {
                let mut cfg: t5::Config = read_family_config(model_dir)?;
                cfg.use_cache = true;
                Inner::T5(t5::T5ForConditionalGeneration::load(vb, &cfg).context("build t5")?)
            }
            Family::Marian => {
                let cfg: marian::Config = read_family_config(model_dir)?;
                Inner::Marian(marian::MTModel::new(&cfg, vb).context("build marian")?)
            }
        };
        Ok(Self {
            inner,
            encoder_output: None,
            device: device.clone(),
        })
    }

    pub fn encode(&mut self, input_ids: &[u32]) -> Result<()> {
        if input_ids.is_empty() {
            bail!("prompt produced no tokens");
        }
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoded = match &mut self.inner {
            Inner::T5(model) => {
                model.clear_kv_cache();
                model.encode(&input)
            }
            Inner::Marian(model) => {
                model.reset_kv_cache();
                model.encoder().forward(&input, 0)
            }
        }
        .context("encode prompt")?;
        self.encoder_output = Some(encoded);
        Ok(())
    }
}

impl Decoder for Seq2SeqLm {
    fn step(&mut self, tokens: &[u32], offset: usize) -> Result<Tensor> {
        let Some(encoder_output) = self.encoder_output.as_ref() else {
            bail!("decoder stepped before the prompt was encoded");
        };
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let logits = match &mut self.inner {
            Inner::T5(model) => model.decode(&input, encoder_output)?,
            Inner::Marian(model) => {
                // marian returns every position; keep the last
                let logits = model.decode(&input, encoder_output, offset)?;
                let seq_len = logits.dim(1)?;
                logits.narrow(1, seq_len - 1, 1)?
            }
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
