//! Process-boundary errors.
//!
//! Library code works in `anyhow::Result` and attaches context as it goes.
//! The runner collapses those into one of the three variants below, each of
//! which maps to a fixed exit status the host process keys off.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The inference backend is not compiled into this binary.
    #[error("Failed to import transformers: {0}")]
    BackendUnavailable(String),

    #[error("Model directory not found: {}", .0.display())]
    ModelDirNotFound(PathBuf),

    /// Any failure while loading the model, building the pipeline, generating
    /// or writing the result.
    #[error("Transformers inference error: {0}")]
    Inference(String),
}

impl Error {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BackendUnavailable(_) => 2,
            Self::ModelDirNotFound(_) => 3,
            Self::Inference(_) => 4,
        }
    }

    pub(crate) fn inference(err: anyhow::Error) -> Self {
        Self::Inference(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        assert_eq!(Error::BackendUnavailable("x".into()).exit_code(), 2);
        assert_eq!(Error::ModelDirNotFound(PathBuf::from("/x")).exit_code(), 3);
        assert_eq!(Error::Inference("x".into()).exit_code(), 4);
    }

    #[test]
    fn messages_keep_host_facing_prefixes() {
        let err = Error::ModelDirNotFound(PathBuf::from("/models/missing"));
        assert_eq!(err.to_string(), "Model directory not found: /models/missing");

        let err = Error::BackendUnavailable("no backend".into());
        assert_eq!(err.to_string(), "Failed to import transformers: no backend");

        let err = Error::inference(anyhow::anyhow!("boom").context("generate"));
        assert_eq!(err.to_string(), "Transformers inference error: generate: boom");
    }
}
