//! Domain error types.

/// Top-level error type for stockframe.
#[derive(Debug, thiserror::Error)]
pub enum StockframeError {
    #[error("duplicate bar for {symbol} at {timestamp} in initial batch")]
    DuplicateKey { symbol: String, timestamp: i64 },

    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("unknown indicator {} ({context})", .missing.join(", "))]
    UnknownIndicator { context: String, missing: Vec<String> },

    #[error("unknown formula: {name}")]
    UnknownFormula { name: String },

    #[error("the following indicator columns are missing: {}", .missing.join(", "))]
    MissingColumn { missing: Vec<String> },

    #[error("invalid parameter {parameter} for {formula}: {reason}")]
    InvalidParameter {
        formula: String,
        parameter: String,
        reason: String,
    },

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

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockframeError> for std::process::ExitCode {
    fn from(err: &StockframeError) -> Self {
        let code: u8 = match err {
            StockframeError::Io(_) => 1,
            StockframeError::ConfigParse { .. }
            | StockframeError::ConfigMissing { .. }
            | StockframeError::ConfigInvalid { .. } => 2,
            StockframeError::Data { .. } => 3,
            StockframeError::UnknownFormula { .. }
            | StockframeError::InvalidParameter { .. }
            | StockframeError::UnknownIndicator { .. }
            | StockframeError::MissingColumn { .. } => 4,
            StockframeError::DuplicateKey { .. } | StockframeError::UnknownSymbol { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
