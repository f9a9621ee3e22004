//! # leaf-analyzer
//!
//! A single-page web app: upload a photo of a leaf, have a multimodal model
//! describe it, and read the answer as sections, labeled fields, bullets and
//! paragraphs.
//!
//! ## Pipeline
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Validate  declared type starts with image/, length ≤ 20 MiB
//!  ├─ 2. Encode    bytes → data:<type>;base64,<payload>
//!  ├─ 3. Analyze   fixed prompt + image → free text (Gemini)
//!  └─ 4. Format    text → ordered DisplayRecords, at render time
//! ```
//!
//! [`controller::ViewController`] owns the UI state and drives the steps;
//! [`server::router`] exposes it over HTTP.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod config;
pub mod controller;
pub mod encode;
pub mod error;
pub mod format;
pub mod page;
pub mod prompts;
pub mod server;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{AnalysisClient, AnalysisError, GeminiClient};
pub use config::AppConfig;
pub use controller::{Phase, StateView, UiState, ViewController};
pub use encode::{encode, EncodedImage};
pub use error::{ConfigError, LeafError};
pub use format::{format, DisplayRecord};
pub use server::{router, AppState};
pub use validate::{validate, ImageSource, UploadedImage, MAX_UPLOAD_BYTES};
