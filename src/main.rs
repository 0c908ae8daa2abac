use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use textgen::params::DEFAULT_SEED;
use textgen::{GenerationParams, Invocation, logging};

#[derive(Parser, Debug)]
#[command(
    name = "textgen",
    version,
    about = "Run one text-generation call against a local model directory (Candle backend)"
)]
struct Args {
    #[arg(long)]
    model_path: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    prompt: String,

    #[arg(long, default_value_t = 128, allow_negative_numbers = true)]
    max_new_tokens: i64,

    #[arg(long, default_value_t = 0.7, allow_negative_numbers = true)]
    temperature: f64,

    #[arg(long, default_value_t = 0.9, allow_negative_numbers = true)]
    top_p: f64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// 1.0 disables the penalty
    #[arg(long, default_value_t = 1.0)]
    repetition_penalty: f32,

    #[arg(long, default_value_t = 64)]
    repeat_last_n: usize,
}

impl From<Args> for Invocation {
    fn from(args: Args) -> Self {
        Self {
            model_path: args.model_path,
            prompt: args.prompt,
            params: GenerationParams {
                max_new_tokens: args.max_new_tokens,
                temperature: args.temperature,
                top_p: args.top_p,
                seed: args.seed,
                repetition_penalty: args.repetition_penalty,
                repeat_last_n: args.repeat_last_n,
            },
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let verbosity = logging::apply_quiet_default();
    logging::init(verbosity);

    let invocation = Invocation::from(args);
    let mut out = std::io::stdout().lock();
    match textgen::run(&invocation, textgen::backend::acquire, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
