#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Decoder-only model directory (llama, mistral or qwen2) for the ignored tests.
pub fn maybe_model_dir() -> Option<PathBuf> {
    std::env::var_os("TEXTGEN_MODEL_DIR").map(PathBuf::from)
}

/// Encoder-decoder model directory (t5 or mt5) for the ignored tests.
pub fn maybe_seq2seq_model_dir() -> Option<PathBuf> {
    std::env::var_os("TEXTGEN_SEQ2SEQ_MODEL_DIR").map(PathBuf::from)
}

pub fn write_config(dir: &Path, json: &str) {
    std::fs::write(dir.join("config.json"), json).expect("write config.json");
}

/// Runs the built binary with a clean verbosity setting.
pub fn textgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_textgen"))
        .args(args)
        .env_remove("TRANSFORMERS_VERBOSITY")
        .output()
        .expect("spawn textgen")
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}
