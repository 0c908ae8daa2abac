use tracing::Level;

/// Verbosity variable honoured by the host's Python tooling. Read here so one
/// setting quiets both.
pub const VERBOSITY_ENV: &str = "TRANSFORMERS_VERBOSITY";

pub const QUIET_VERBOSITY: &str = "error";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    /// Unknown values fall back to `Error`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warning" | "warn" => Self::Warn,
            "info" => Self::Info,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Error,
        }
    }
}

impl From<Verbosity> for Level {
    fn from(value: Verbosity) -> Self {
        match value {
            Verbosity::Error => Level::ERROR,
            Verbosity::Warn => Level::WARN,
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
            Verbosity::Trace => Level::TRACE,
        }
    }
}

/// Returns the value to set for [`VERBOSITY_ENV`], or `None` when the caller
/// already chose one.
pub fn quiet_default(current: Option<&str>) -> Option<&'static str> {
    match current {
        Some(_) => None,
        None => Some(QUIET_VERBOSITY),
    }
}

/// Sets [`VERBOSITY_ENV`] to `error` unless already present, then returns the
/// effective verbosity.
///
/// Must run before any other thread exists.
pub fn apply_quiet_default() -> Verbosity {
    let current = std::env::var(VERBOSITY_ENV).ok();
    if let Some(value) = quiet_default(current.as_deref()) {
        // SAFETY: called once at the top of `main`, before any thread is spawned.
        unsafe { std::env::set_var(VERBOSITY_ENV, value) };
        return Verbosity::parse(value);
    }
    Verbosity::parse(current.as_deref().unwrap_or(QUIET_VERBOSITY))
}

/// Installs the stderr subscriber. Stdout stays reserved for the payload.
pub fn init(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_max_level(Level::from(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
