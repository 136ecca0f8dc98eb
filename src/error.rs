//! Error types for the guitar transcription and synthesis system

use std::fmt;

/// Custom error type for transcription and synthesis processing
#[derive(Debug, Clone)]
pub enum TabError {
    /// E001: Audio payload could not be decoded into PCM
    DecodeError(String),
    /// E002: WAV container structure violation (bad magic, missing chunk)
    MalformedContainer(String),
    /// E003: Unsupported sample rate
    UnsupportedSampleRate(u32),
    /// E004: Input validation error
    InputValidationError(String),
    /// E005: External note-detection model failed or is absent
    InferenceUnavailable(String),
    /// E006: No onsets detected in the input
    NoOnsetsFound,
    /// E007: Onsets present but no pitched notes detected
    NoPitchedNotes,
    /// E008: Configuration validation failed
    ConfigValidationFailed(String),
    /// E009: Chord progression file could not be parsed
    ChordParseError(String),
    /// E010: Export error (tab text, MIDI, analysis JSON)
    ExportError(String),
    /// E011: QA artifact generation error
    QaGenerationError(String),
    /// E012: Pipeline cancelled via token
    Cancelled,
}

impl fmt::Display for TabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabError::DecodeError(msg) => {
                write!(f, "E001: Audio decode error - {}", msg)
            }
            TabError::MalformedContainer(msg) => {
                write!(f, "E002: Malformed WAV container - {}", msg)
            }
            TabError::UnsupportedSampleRate(sr) => {
                write!(f, "E003: Unsupported sample rate {} Hz", sr)
            }
            TabError::InputValidationError(msg) => {
                write!(f, "E004: Input validation error - {}", msg)
            }
            TabError::InferenceUnavailable(msg) => {
                write!(f, "E005: Note-detection model unavailable - {}", msg)
            }
            TabError::NoOnsetsFound => {
                write!(f, "E006: No onsets found in input audio")
            }
            TabError::NoPitchedNotes => {
                write!(f, "E007: No pitched notes detected in input audio")
            }
            TabError::ConfigValidationFailed(msg) => {
                write!(f, "E008: Configuration validation failed - {}", msg)
            }
            TabError::ChordParseError(msg) => {
                write!(f, "E009: Chord progression parse error - {}", msg)
            }
            TabError::ExportError(msg) => {
                write!(f, "E010: Export error - {}", msg)
            }
            TabError::QaGenerationError(msg) => {
                write!(f, "E011: QA artifact generation error - {}", msg)
            }
            TabError::Cancelled => {
                write!(f, "E012: Processing cancelled")
            }
        }
    }
}

impl std::error::Error for TabError {}

// From implementations for common error types
impl From<std::io::Error> for TabError {
    fn from(err: std::io::Error) -> Self {
        TabError::ExportError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for TabError {
    fn from(err: serde_json::Error) -> Self {
        TabError::ExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for TabError {
    fn from(err: anyhow::Error) -> Self {
        TabError::ConfigValidationFailed(format!("{}", err))
    }
}

// Note: Plotters errors are handled manually in the code due to complex type parameters

/// Result type alias for transcription and synthesis operations
pub type Result<T> = std::result::Result<T, TabError>;
