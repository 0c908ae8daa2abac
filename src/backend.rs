//! Selection of the inference backend compiled into this binary.

use crate::error::Error;
use crate::runner::Backend;

#[cfg(feature = "candle")]
pub fn acquire() -> Result<Box<dyn Backend>, Error> {
    Ok(Box::new(crate::pipeline::CandleBackend::cpu()))
}

#[cfg(not(feature = "candle"))]
pub fn acquire() -> Result<Box<dyn Backend>, Error> {
    Err(Error::BackendUnavailable(
        "textgen was built without the `candle` feature".to_string(),
    ))
}
