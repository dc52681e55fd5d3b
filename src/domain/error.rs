//! Domain error types.

/// Top-level error type for ninetrader.
#[derive(Debug, thiserror::Error)]
pub enum NinetraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("weights cannot be normalized: {reason}")]
    Weights { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("execution transport error: {reason}")]
    Transport { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&NinetraderError> for std::process::ExitCode {
    fn from(err: &NinetraderError) -> Self {
        let code: u8 = match err {
            NinetraderError::Io(_) => 1,
            NinetraderError::ConfigParse { .. }
            | NinetraderError::ConfigMissing { .. }
            | NinetraderError::ConfigInvalid { .. }
            | NinetraderError::Weights { .. } => 2,
            NinetraderError::Data { .. } => 3,
            NinetraderError::Transport { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
