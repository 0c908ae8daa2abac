pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod params;
pub mod runner;

#[cfg(feature = "candle")]
pub mod generate;
#[cfg(feature = "candle")]
pub mod loader;
#[cfg(feature = "candle")]
pub mod model;
#[cfg(feature = "candle")]
pub mod pipeline;
#[cfg(feature = "candle")]
pub mod tokenizer;

pub use config::{Architecture, Task};
pub use error::Error;
pub use output::Candidate;
pub use params::{GenerationParams, SamplingConfig};
pub use runner::{Backend, Invocation, TextGenerator, run};

#[cfg(feature = "candle")]
use candle_core::{DType, Device};

/// Where tensors live. Generation always runs on the CPU.
#[cfg(feature = "candle")]
pub struct Runtime {
    pub device: Device,
    pub dtype: DType,
}

#[cfg(feature = "candle")]
impl Runtime {
    pub fn cpu_f32() -> Self {
        Self {
            device: Device::Cpu,
            dtype: DType::F32,
        }
    }
}
