use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::config::Task;
use crate::error::Error;
use crate::output::Candidate;
use crate::params::{GenerationParams, SamplingConfig};

/// One parsed command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub model_path: PathBuf,
    pub prompt: String,
    pub params: GenerationParams,
}

/// A loaded model bound to its task.
pub trait TextGenerator {
    fn task(&self) -> Task;

    fn generate(&mut self, prompt: &str, cfg: &SamplingConfig) -> anyhow::Result<Vec<Candidate>>;
}

/// Something that can turn a model directory into a [`TextGenerator`].
pub trait Backend {
    fn load(&self, model_dir: &Path) -> anyhow::Result<Box<dyn TextGenerator>>;
}

/// Runs one invocation and writes exactly one line to `out` on success.
pub fn run<F, W>(invocation: &Invocation, acquire_backend: F, out: &mut W) -> Result<(), Error>
where
    F: FnOnce() -> Result<Box<dyn Backend>, Error>,
    W: Write,
{
    let backend = acquire_backend()?;

    let model_dir = invocation.model_path.as_path();
    if !model_dir.is_dir() {
        return Err(Error::ModelDirNotFound(model_dir.to_path_buf()));
    }

    generate_line(backend.as_ref(), invocation, out).map_err(Error::inference)
}

fn generate_line<W: Write>(
    backend: &dyn Backend,
    invocation: &Invocation,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut generator = backend.load(&invocation.model_path)?;
    info!(task = %generator.task(), "pipeline ready");

    let cfg = invocation.params.effective();
    debug!(?cfg, "effective sampling");
    let candidates = generator.generate(&invocation.prompt, &cfg)?;

    let text = candidates.first().map(Candidate::text).unwrap_or("");
    writeln!(out, "{text}").context("write output")?;
    out.flush().context("flush output")?;
    Ok(())
}
