use anyhow::{Context, Result, bail};
use candle_core::{DType, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::utils::apply_repeat_penalty;
use tracing::{debug, warn};

use crate::params::SamplingConfig;

/// One forward step of an autoregressive model.
pub trait Decoder {
    /// Feeds `tokens` (not yet seen by the model) starting at position
    /// `offset` and returns the logits of the last position.
    fn step(&mut self, tokens: &[u32], offset: usize) -> Result<Tensor>;
}

/// When to stop besides `max_new_tokens`.
#[derive(Debug, Clone, Default)]
pub struct StopCondition {
    pub eos_ids: Vec<u32>,
    /// Total positions the model can attend over, prompt included.
    pub context_limit: Option<usize>,
}

/// Drives `decoder` from `seed` until a stop condition and returns the new
/// tokens only. Stop tokens are not included.
pub fn sample_tokens<D: Decoder + ?Sized>(
    decoder: &mut D,
    seed: &[u32],
    cfg: &SamplingConfig,
    stop: &StopCondition,
) -> Result<Vec<u32>> {
    if seed.is_empty() {
        bail!("prompt produced no tokens");
    }

    let mut processor =
        LogitsProcessor::new(cfg.seed, cfg.sampler_temperature(), cfg.sampler_top_p());
    let mut context = seed.to_vec();
    let mut generated = Vec::with_capacity(cfg.max_new_tokens.min(4096));
    let mut offset = 0;
    let mut pending = seed.to_vec();

    while generated.len() < cfg.max_new_tokens {
        if stop.context_limit.is_some_and(|limit| context.len() >= limit) {
            warn!(
                limit = ?stop.context_limit,
                generated = generated.len(),
                "context window full, stopping early"
            );
            break;
        }

        let logits = decoder
            .step(&pending, offset)
            .with_context(|| format!("forward at position {offset}"))?;
        let logits = logits
            .flatten_all()
            .context("flatten logits")?
            .to_dtype(DType::F32)
            .context("logits to f32")?;
        let logits = if cfg.repetition_penalty == 1.0 {
            logits
        } else {
            let start = context.len().saturating_sub(cfg.repeat_last_n);
            apply_repeat_penalty(&logits, cfg.repetition_penalty, &context[start..])
                .context("apply repetition penalty")?
        };

        let next = processor.sample(&logits).context("sample next token")?;
        offset += pending.len();
        if stop.eos_ids.contains(&next) {
            debug!(token = next, "eos");
            break;
        }
        generated.push(next);
        context.push(next);
        pending.clear();
        pending.push(next);
    }

    Ok(generated)
}
