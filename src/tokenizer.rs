use std::path::Path;

use anyhow::{Context, Result, bail};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TextTokenizer {
    inner: Tokenizer,
}

pub fn load_tokenizer(model_dir: &Path) -> Result<TextTokenizer> {
    let tok_json = model_dir.join(TOKENIZER_FILE);
    if !tok_json.exists() {
        bail!("missing {TOKENIZER_FILE} at {tok_json:?}");
    }
    let inner = Tokenizer::from_file(&tok_json)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("load {tok_json:?}"))?;
    Ok(TextTokenizer { inner })
}

impl TextTokenizer {
    pub fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>> {
        let enc = self
            .inner
            .encode(text, add_special_tokens)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    /// Special tokens are dropped from the decoded text.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("{e}"))
    }
}
