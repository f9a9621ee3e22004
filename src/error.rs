//! Error types for the leaf analyzer.
//!
//! * [`LeafError`] is the user-visible taxonomy. Its `Display` text is what
//!   lands in the page's error banner, so every message is written for the
//!   person holding the leaf, not for whoever reads the logs.
//! * [`ConfigError`] is a startup failure; the binary refuses to start.
//!
//! Every `LeafError` is recovered at the controller boundary and recorded in
//! the UI state. None of them stops the server.

use crate::analysis::AnalysisError;
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// A failed step of the upload / analysis pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LeafError {
    // ── Intake ────────────────────────────────────────────────────────────
    /// Declared media type does not start with `image/`.
    #[error("Please upload a valid image file (JPEG or PNG).")]
    InvalidType { media_type: String },

    /// Declared length exceeds the upload limit.
    #[error("Image is too large. Please upload an image under {} MB.", .limit / MIB)]
    TooLarge { size: u64, limit: u64 },

    /// The file bytes could not be read.
    #[error("Could not read the selected file. Please try again.")]
    ReadFailure { detail: String },

    // ── Collaborator ──────────────────────────────────────────────────────
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    // ── Startup ───────────────────────────────────────────────────────────
    /// The default example could not be loaded at startup.
    #[error("Could not load the default leaf example: {detail}")]
    Bootstrap { detail: String },

    // ── Surface ───────────────────────────────────────────────────────────
    /// An analysis is already in flight.
    #[error("An analysis is already in progress. Please wait for it to finish.")]
    Busy,

    /// Re-analyze was requested before any image was loaded.
    #[error("Upload a leaf image before requesting an analysis.")]
    NoImage,

    /// A transition stopped before finishing (the analysis client panicked).
    #[error("The analysis was interrupted. Please try again.")]
    Interrupted,
}

/// Invalid or missing startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set (in the environment or a .env file)")]
    Missing { name: &'static str },

    #[error("{name} is not a valid socket address: '{value}'")]
    InvalidAddr { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_mentions_limit_in_mib() {
        let e = LeafError::TooLarge {
            size: 21 * MIB,
            limit: 20 * MIB,
        };
        assert!(e.to_string().contains("20 MB"), "got: {e}");
    }

    #[test]
    fn analysis_message_is_passed_through() {
        let e = LeafError::from(AnalysisError::Provider("quota exhausted".into()));
        assert_eq!(e.to_string(), "quota exhausted");
    }

    #[test]
    fn read_failure_hides_detail() {
        let e = LeafError::ReadFailure {
            detail: "connection reset".into(),
        };
        assert!(!e.to_string().contains("connection reset"));
        assert!(e.to_string().contains("try again"));
    }

    #[test]
    fn missing_config_names_variable() {
        let e = ConfigError::Missing {
            name: "GEMINI_API_KEY",
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }
}
