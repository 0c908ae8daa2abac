/// Default sampler seed, matches the value the Candle examples use.
pub const DEFAULT_SEED: u64 = 299_792_458;

/// Sampling values as the caller passed them. Nothing is clamped here.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: i64,
    pub temperature: f64,
    pub top_p: f64,
    pub seed: u64,
    pub repetition_penalty: f32,
    pub repeat_last_n: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 128,
            temperature: 0.7,
            top_p: 0.9,
            seed: DEFAULT_SEED,
            repetition_penalty: 1.0,
            repeat_last_n: 64,
        }
    }
}

/// Values actually handed to the token loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    /// `false` means greedy decoding.
    pub do_sample: bool,
    /// Always `false`: only newly generated text is returned, never the prompt.
    pub return_full_text: bool,
    pub seed: u64,
    pub repetition_penalty: f32,
    pub repeat_last_n: usize,
}

impl GenerationParams {
    pub fn effective(&self) -> SamplingConfig {
        let max_new_tokens = usize::try_from(self.max_new_tokens.max(1)).unwrap_or(usize::MAX);
        let top_p = if self.top_p.is_nan() {
            1.0
        } else {
            self.top_p.clamp(0.0, 1.0)
        };
        SamplingConfig {
            max_new_tokens,
            temperature: self.temperature.max(0.0),
            top_p,
            // decided on the raw value, before the floor above
            do_sample: self.temperature > 0.0,
            return_full_text: false,
            seed: self.seed,
            repetition_penalty: self.repetition_penalty,
            repeat_last_n: self.repeat_last_n,
        }
    }
}

impl SamplingConfig {
    /// Temperature for the sampler, `None` selects argmax.
    ///
    /// A nucleus of zero mass still keeps the single most likely token, which
    /// is argmax.
    pub fn sampler_temperature(&self) -> Option<f64> {
        (self.do_sample && self.top_p > 0.0).then_some(self.temperature)
    }

    pub fn sampler_top_p(&self) -> Option<f64> {
        (self.do_sample && self.top_p < 1.0).then_some(self.top_p)
    }
}
