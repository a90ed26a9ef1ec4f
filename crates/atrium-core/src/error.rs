//! Error types shared across the viewer

use thiserror::Error;

/// Why a model load attempt did not produce a scene
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Network or HTTP failure fetching the asset
    #[error("Transport error: {0}")]
    Transport(String),
    /// Malformed or unsupported asset payload
    #[error("Decode error: {0}")]
    Decode(String),
    /// A required sub-loader or codec was not ready
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Requested unit number is outside the configured range
    #[error("Invalid unit {unit}: expected {min}..={max}")]
    InvalidUnit { unit: u32, min: u32, max: u32 },
    /// Preempted by a newer request; never shown to the user
    #[error("Load superseded by generation {0}")]
    Superseded(u64),
}

impl LoadError {
    /// Transport and decode failures go through the fallback policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Transport(_) | LoadError::Decode(_))
    }

    /// Short machine-readable tag, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Transport(_) => "transport",
            LoadError::Decode(_) => "decode",
            LoadError::Initialization(_) => "initialization",
            LoadError::InvalidUnit { .. } => "invalid_unit",
            LoadError::Superseded(_) => "superseded",
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
