use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::Runtime;
use crate::config::{self, Architecture, Task};
use crate::generate::{StopCondition, sample_tokens};
use crate::model::Model;
use crate::output::Candidate;
use crate::params::SamplingConfig;
use crate::runner::{Backend, TextGenerator};
use crate::tokenizer::{self, TextTokenizer};

/// A model, its tokenizer and the task they were loaded for.
pub struct Pipeline {
    task: Task,
    model: Model,
    tokenizer: TextTokenizer,
    stop: StopCondition,
    decoder_start: u32,
}

impl Pipeline {
    pub fn load(model_dir: &Path, rt: &Runtime) -> Result<Self> {
        let model_config = config::load_model_config(model_dir)?;
        let architecture = model_config.architecture();
        let task = architecture.task();
        info!(model_type = model_config.model_type(), %task, "selected task");

        let generation = config::load_generation_config(model_dir)?;
        let model = Model::load(&model_config, model_dir, rt)?;
        let tokenizer = tokenizer::load_tokenizer(model_dir)?;

        let stop = StopCondition {
            eos_ids: model_config.stop_tokens(generation.as_ref()),
            context_limit: match architecture {
                Architecture::CausalDecoder => model_config.max_position_embeddings,
                Architecture::EncoderDecoder => None,
            },
        };
        let decoder_start = generation
            .as_ref()
            .and_then(|g| g.decoder_start_token_id)
            .or(model_config.decoder_start_token_id)
            .or(model_config.pad_token_id)
            .unwrap_or(0);
        debug!(?stop, decoder_start, "stop condition");

        Ok(Self {
            task,
            model,
            tokenizer,
            stop,
            decoder_start,
        })
    }

    /// Generates a continuation of `prompt`. The prompt is never echoed.
    pub fn generate_text(&mut self, prompt: &str, cfg: &SamplingConfig) -> Result<String> {
        let prompt_ids = self
            .tokenizer
            .encode(prompt, true)
            .context("tokenize prompt")?;
        debug!(prompt_tokens = prompt_ids.len(), "encoded prompt");

        let new_ids = match &mut self.model {
            Model::Causal(lm) => {
                lm.reset()?;
                sample_tokens(lm, &prompt_ids, cfg, &self.stop)?
            }
            Model::Seq2Seq(lm) => {
                lm.encode(&prompt_ids)?;
                sample_tokens(lm, &[self.decoder_start], cfg, &self.stop)?
            }
        };
        debug!(new_tokens = new_ids.len(), "generated");

        self.tokenizer.decode(&new_ids).context("decode")
    }
}

impl TextGenerator for Pipeline {
    fn task(&self) -> Task {
        self.task
    }

    fn generate(&mut self, prompt: &str, cfg: &SamplingConfig) -> Result<Vec<Candidate>> {
        let text = self.generate_text(prompt, cfg)?;
        Ok(vec![Candidate::generated(text)])
    }
}

/// Loads pipelines on the CPU in `f32`.
pub struct CandleBackend {
    runtime: Runtime,
}

impl CandleBackend {
    pub fn cpu() -> Self {
        Self {
            runtime: Runtime::cpu_f32(),
        }
    }
}

impl Backend for CandleBackend {
    fn load(&self, model_dir: &Path) -> Result<Box<dyn TextGenerator>> {
        let pipeline = Pipeline::load(model_dir, &self.runtime)?;
        Ok(Box::new(pipeline))
    }
}
