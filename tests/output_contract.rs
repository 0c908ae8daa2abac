use std::path::Path;

use anyhow::{Result, bail};
use tempfile::tempdir;
use textgen::{
    Backend, Candidate, Error, GenerationParams, Invocation, SamplingConfig, Task, TextGenerator,
};

/// Backend whose generator returns a fixed result and checks the sampling
/// values it receives.
struct Fixed {
    result: Option<Vec<Candidate>>,
}

struct FixedGenerator {
    result: Option<Vec<Candidate>>,
}

impl Backend for Fixed {
    fn load(&self, _: &Path) -> Result<Box<dyn TextGenerator>> {
        Ok(Box::new(FixedGenerator {
            result: self.result.clone(),
        }))
    }
}

impl TextGenerator for FixedGenerator {
    fn task(&self) -> Task {
        Task::Text2TextGeneration
    }

    fn generate(&mut self, _: &str, cfg: &SamplingConfig) -> Result<Vec<Candidate>> {
        assert!(cfg.max_new_tokens >= 1);
        assert!((0.0..=1.0).contains(&cfg.top_p));
        assert!(!cfg.return_full_text);
        match &self.result {
            Some(r) => Ok(r.clone()),
            None => bail!("out of memory while sampling"),
        }
    }
}

fn run_with(result: Option<Vec<Candidate>>, params: GenerationParams) -> (Result<(), Error>, String) {
    let dir = tempdir().expect("tempdir");
    let invocation = Invocation {
        model_path: dir.path().to_path_buf(),
        prompt: "Summarize: a long text".into(),
        params,
    };
    let mut out = Vec::new();
    let res = textgen::run(
        &invocation,
        || Ok(Box::new(Fixed { result }) as Box<dyn Backend>),
        &mut out,
    );
    (res, String::from_utf8(out).expect("utf8"))
}

#[test]
fn first_candidate_text_is_the_whole_stdout() {
    let (res, out) = run_with(
        Some(vec![Candidate::generated("hello world")]),
        GenerationParams::default(),
    );
    res.expect("success");
    assert_eq!(out, "hello world\n");
}

#[test]
fn summary_text_is_used_when_generated_text_is_absent() {
    let (res, out) = run_with(
        Some(vec![Candidate::summary("short version")]),
        GenerationParams::default(),
    );
    res.expect("success");
    assert_eq!(out, "short version\n");
}

#[test]
fn candidate_without_text_prints_empty_line() {
    let (res, out) = run_with(Some(vec![Candidate::default()]), GenerationParams::default());
    res.expect("success");
    assert_eq!(out, "\n");
}

#[test]
fn no_candidates_prints_empty_line() {
    let (res, out) = run_with(Some(Vec::new()), GenerationParams::default());
    res.expect("success");
    assert_eq!(out, "\n");
}

#[test]
fn out_of_range_params_reach_the_generator_clamped() {
    let params = GenerationParams {
        max_new_tokens: -3,
        temperature: -2.0,
        top_p: 4.0,
        ..GenerationParams::default()
    };
    let (res, out) = run_with(Some(vec![Candidate::generated("ok")]), params);
    res.expect("success");
    assert_eq!(out, "ok\n");
}

#[test]
fn generator_failure_is_exit_4_with_cause() {
    let (res, out) = run_with(None, GenerationParams::default());
    let err = res.expect_err("should fail");
    assert_eq!(err.exit_code(), 4);
    let msg = err.to_string();
    assert!(msg.starts_with("Transformers inference error:"), "{msg}");
    assert!(msg.contains("out of memory while sampling"), "{msg}");
    assert!(out.is_empty());
}
