//! Error types for kuchi

use thiserror::Error;

use crate::VoiceId;

/// Coarse error classification, stable across message changes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Fetch,
    Decode,
    Graph,
    SampleTick,
    UnknownVoice,
    Catalog,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Decode => "decode",
            ErrorKind::Graph => "graph",
            ErrorKind::SampleTick => "sample-tick",
            ErrorKind::UnknownVoice => "unknown-voice",
            ErrorKind::Catalog => "catalog",
            ErrorKind::Config => "config",
        }
    }
}

/// Core kuchi errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KuchiError {
    // Loading errors
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Fetch failed for {url}: HTTP status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Audio decode failed: {0}")]
    Decode(String),

    // Graph errors
    #[error("Playback graph error: {0}")]
    Graph(String),

    // Per-tick errors, never fatal to a session
    #[error("Spectrum read failed: {0}")]
    SampleTick(String),

    // Catalog errors
    #[error("Unknown voice: {0}")]
    UnknownVoice(VoiceId),

    #[error("Invalid speaker catalog: {0}")]
    Catalog(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl KuchiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KuchiError::Fetch { .. } | KuchiError::FetchStatus { .. } => ErrorKind::Fetch,
            KuchiError::Decode(_) => ErrorKind::Decode,
            KuchiError::Graph(_) => ErrorKind::Graph,
            KuchiError::SampleTick(_) => ErrorKind::SampleTick,
            KuchiError::UnknownVoice(_) => ErrorKind::UnknownVoice,
            KuchiError::Catalog(_) => ErrorKind::Catalog,
            KuchiError::Config(_) => ErrorKind::Config,
        }
    }

    /// Does this error abort a playback session?
    pub fn is_fatal(&self) -> bool {
        !matches!(self, KuchiError::SampleTick(_))
    }

    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        KuchiError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for kuchi operations
pub type KuchiResult<T> = Result<T, KuchiError>;
