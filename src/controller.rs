//! The view controller: the single UI state and the transitions over it.
//!
//! ```text
//!          select / reanalyze / bootstrap
//!   Idle ─────────────────────────────────▶ Loading ──▶ Loaded
//!     ▲                                       │   └────▶ Failed
//!     └─ (any state may re-enter Loading) ────┘
//! ```
//!
//! The state lock is never held across an await point: every transition
//! locks, updates, and releases, then suspends on file reads or the analysis
//! call with the lock free. `loading` doubles as the in-flight guard, so a
//! second `select` or `reanalyze` while one is pending returns
//! [`LeafError::Busy`] and changes nothing.
//!
//! Entering `Loading` hands out an `InFlight` token. Dropping it before the
//! transition settles (the analysis client panicked, the task was cancelled)
//! moves to `Failed` with [`LeafError::Interrupted`].

use crate::analysis::AnalysisClient;
use crate::encode::{encode, EncodedImage};
use crate::error::LeafError;
use crate::format::{format, DisplayRecord};
use crate::prompts::{DEFAULT_ANALYSIS, LEAF_ANALYSIS_PROMPT};
use crate::validate::{validate, UploadedImage};
use serde::Serialize;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

/// Enough leading bytes for `image::guess_format` to recognise every
/// format the bootstrap asset may use.
const SNIFF_LEN: u64 = 32;

/// What the page shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub image: Option<EncodedImage>,
    /// Raw analysis text; formatted lazily by [`ViewController::view`].
    pub analysis: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

impl UiState {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else if self.analysis.is_some() {
            Phase::Loaded
        } else {
            Phase::Idle
        }
    }
}

/// Rendered snapshot of the controller, serialised for the page.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub phase: Phase,
    pub image: Option<EncodedImage>,
    pub analysis: Option<String>,
    pub records: Vec<DisplayRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub model: String,
    pub processing_time_ms: Option<u64>,
}

#[derive(Default)]
struct Inner {
    ui: UiState,
    processing_time_ms: Option<u64>,
}

pub struct ViewController {
    client: Arc<dyn AnalysisClient>,
    inner: Mutex<Inner>,
}

impl ViewController {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self {
            client,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Populate the default display from a local asset and the built-in
    /// demo analysis. Never calls the analysis service.
    ///
    /// The asset gets the same checks as an upload, with its media type
    /// sniffed from its magic bytes rather than trusted from the extension.
    pub async fn bootstrap(&self, asset: &Path) -> Result<(), LeafError> {
        let ((), in_flight) = self.begin(|_| Ok(()))?;

        match load_bootstrap_image(asset).await {
            Ok(image) => {
                in_flight.succeed(|inner| {
                    inner.ui.image = Some(image);
                    inner.ui.analysis = Some(DEFAULT_ANALYSIS.to_string());
                });
                info!("Loaded default example from {}", asset.display());
                Ok(())
            }
            Err(e) => Err(in_flight.fail(e)),
        }
    }

    /// A new file was selected: validate, encode, analyze.
    ///
    /// A validation failure records the error but leaves the current image
    /// and analysis on screen.
    pub async fn select(&self, file: UploadedImage) -> Result<(), LeafError> {
        let ((), in_flight) = self.begin(|_| validate(&file))?;

        info!("Accepted {} upload ({} bytes)", file.media_type, file.len);

        let image = match encode(file).await {
            Ok(image) => image,
            Err(e) => return Err(in_flight.fail(e)),
        };
        self.lock().ui.image = Some(image.clone());

        self.run_analysis(image, in_flight).await
    }

    /// Analyze the already-encoded image again. No re-upload, no re-validation.
    pub async fn reanalyze(&self) -> Result<(), LeafError> {
        let (image, in_flight) = self.begin(|ui| ui.image.clone().ok_or(LeafError::NoImage))?;
        self.run_analysis(image, in_flight).await
    }

    pub fn snapshot(&self) -> UiState {
        self.lock().ui.clone()
    }

    /// Snapshot plus formatted records.
    pub fn view(&self) -> StateView {
        let inner = self.lock();
        let ui = &inner.ui;
        StateView {
            phase: ui.phase(),
            image: ui.image.clone(),
            analysis: ui.analysis.clone(),
            records: ui.analysis.as_deref().map(format).unwrap_or_default(),
            loading: ui.loading,
            error: ui.error.clone(),
            model: self.client.model_name().to_string(),
            processing_time_ms: inner.processing_time_ms,
        }
    }

    /// Enter `Loading` if nothing is in flight and `check` passes.
    ///
    /// `Busy` leaves the state untouched. Any other `check` failure is
    /// recorded in `error` without entering `Loading`.
    fn begin<T>(
        &self,
        check: impl FnOnce(&UiState) -> Result<T, LeafError>,
    ) -> Result<(T, InFlight<'_>), LeafError> {
        let mut inner = self.lock();
        if inner.ui.loading {
            return Err(LeafError::Busy);
        }
        match check(&inner.ui) {
            Ok(value) => {
                inner.ui.loading = true;
                inner.ui.error = None;
                Ok((
                    value,
                    InFlight {
                        controller: self,
                        settled: false,
                    },
                ))
            }
            Err(e) => {
                warn!("Rejected: {}", e);
                inner.ui.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Record a failure that happened before a file reached the controller
    /// (e.g. the request body could not be read). Returns `Busy` instead
    /// while an analysis is in flight.
    pub fn reject(&self, e: LeafError) -> LeafError {
        let mut inner = self.lock();
        if inner.ui.loading {
            return LeafError::Busy;
        }
        warn!("Rejected: {}", e);
        inner.ui.error = Some(e.to_string());
        e
    }

    /// Leave `Loading` for `Failed`. `image` and `analysis` keep their values.
    fn fail(&self, e: LeafError) -> LeafError {
        warn!("Failed: {}", e);
        let mut inner = self.lock();
        inner.ui.loading = false;
        inner.ui.error = Some(e.to_string());
        e
    }

    async fn run_analysis(&self, image: EncodedImage, in_flight: InFlight<'_>) -> Result<(), LeafError> {
        let start = Instant::now();
        match self.client.analyze(&image, LEAF_ANALYSIS_PROMPT).await {
            Ok(text) => {
                let elapsed = start.elapsed().as_millis() as u64;
                info!("Analysis complete in {}ms", elapsed);
                in_flight.succeed(|inner| {
                    inner.ui.analysis = Some(text);
                    inner.processing_time_ms = Some(elapsed);
                });
                Ok(())
            }
            Err(e) => Err(in_flight.fail(e.into())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Critical sections are plain field assignments; a poisoned lock
        // still holds consistent state.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Proof that the controller is in `Loading`. Settle it with
/// [`InFlight::succeed`] or [`InFlight::fail`]; dropping it unsettled fails
/// the transition with [`LeafError::Interrupted`].
struct InFlight<'a> {
    controller: &'a ViewController,
    settled: bool,
}

impl InFlight<'_> {
    /// Leave `Loading` for `Loaded`, clearing `error`.
    fn succeed(mut self, update: impl FnOnce(&mut Inner)) {
        self.settled = true;
        let mut inner = self.controller.lock();
        update(&mut *inner);
        inner.ui.loading = false;
        inner.ui.error = None;
    }

    fn fail(mut self, e: LeafError) -> LeafError {
        self.settled = true;
        self.controller.fail(e)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.fail(LeafError::Interrupted);
        }
    }
}

/// Sniff, validate, then encode the asset. The validator sees the real
/// length and format before the whole file is read.
async fn load_bootstrap_image(asset: &Path) -> Result<EncodedImage, LeafError> {
    let bootstrap = |detail: String| LeafError::Bootstrap {
        detail: format!("{}: {}", asset.display(), detail),
    };

    let (head, len) = read_head(asset).await.map_err(|e| bootstrap(e.to_string()))?;
    let file = UploadedImage::from_file(sniff_media_type(&head), len, asset);
    validate(&file).map_err(|e| bootstrap(e.to_string()))?;

    encode(file).await.map_err(|e| match e {
        LeafError::ReadFailure { detail } => bootstrap(detail),
        other => bootstrap(other.to_string()),
    })
}

async fn read_head(path: &Path) -> io::Result<(Vec<u8>, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head).await?;
    Ok((head, len))
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    use image::ImageFormat;
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;
    use async_trait::async_trait;
    use axum::body::Bytes;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// Replies from a queue; optionally parks until released.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, AnalysisError>>>,
        prompts: Mutex<Vec<String>>,
        gate: Option<(Notify, Notify)>,
    }

    impl ScriptedClient {
        fn replying(replies: Vec<Result<String, AnalysisError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }

        fn gated(reply: Result<String, AnalysisError>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::from([reply])),
                gate: Some((Notify::new(), Notify::new())),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AnalysisClient for ScriptedClient {
        async fn analyze(&self, _image: &EncodedImage, prompt: &str) -> Result<String, AnalysisError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AnalysisError::Unavailable))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct PanickingClient;

    #[async_trait]
    impl AnalysisClient for PanickingClient {
        async fn analyze(&self, _image: &EncodedImage, _prompt: &str) -> Result<String, AnalysisError> {
            panic!("client bug");
        }

        fn model_name(&self) -> &str {
            "panicking"
        }
    }

    fn png_upload() -> UploadedImage {
        UploadedImage::from_bytes("image/png", Bytes::from_static(PNG_MAGIC))
    }

    #[test]
    fn phase_is_derived_from_fields() {
        let mut ui = UiState::default();
        assert_eq!(ui.phase(), Phase::Idle);
        ui.analysis = Some("x".into());
        assert_eq!(ui.phase(), Phase::Loaded);
        ui.error = Some("e".into());
        assert_eq!(ui.phase(), Phase::Failed);
        ui.loading = true;
        assert_eq!(ui.phase(), Phase::Loading);
    }

    #[tokio::test]
    async fn successful_upload_stores_image_and_text() {
        let client = ScriptedClient::replying(vec![Ok("1. Species:\n- Name: Oak".into())]);
        let controller = ViewController::new(client.clone());

        controller.select(png_upload()).await.unwrap();

        let ui = controller.snapshot();
        assert_eq!(ui.phase(), Phase::Loaded);
        assert!(ui.image.unwrap().as_str().starts_with("data:image/png;base64,"));
        assert_eq!(ui.analysis.as_deref(), Some("1. Species:\n- Name: Oak"));
        assert_eq!(client.prompts.lock().unwrap()[0], LEAF_ANALYSIS_PROMPT);

        let view = controller.view();
        assert_eq!(view.records.len(), 2);
        assert_eq!(view.model, "scripted");
        assert!(view.processing_time_ms.is_some());
    }

    #[tokio::test]
    async fn failed_reanalyze_keeps_previous_analysis() {
        let client = ScriptedClient::replying(vec![
            Ok("A maple.".into()),
            Err(AnalysisError::Provider("quota exceeded".into())),
        ]);
        let controller = ViewController::new(client);

        controller.select(png_upload()).await.unwrap();
        let err = controller.reanalyze().await.unwrap_err();

        assert_eq!(err, LeafError::Analysis(AnalysisError::Provider("quota exceeded".into())));
        let ui = controller.snapshot();
        assert_eq!(ui.phase(), Phase::Failed);
        assert_eq!(ui.analysis.as_deref(), Some("A maple."));
        assert_eq!(ui.error.as_deref(), Some("quota exceeded"));
        assert!(!ui.loading);
    }

    #[tokio::test]
    async fn invalid_upload_keeps_previous_result() {
        let client = ScriptedClient::replying(vec![Ok("A maple.".into())]);
        let controller = ViewController::new(client.clone());
        controller.select(png_upload()).await.unwrap();
        let before = controller.snapshot();

        let pdf = UploadedImage::from_bytes("application/pdf", Bytes::from_static(b"%PDF"));
        let err = controller.select(pdf).await.unwrap_err();

        assert!(matches!(err, LeafError::InvalidType { .. }));
        let after = controller.snapshot();
        assert_eq!(after.image, before.image);
        assert_eq!(after.analysis, before.analysis);
        assert_eq!(after.error, Some(err.to_string()));
        assert!(!after.loading);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn unreadable_file_fails_without_calling_service() {
        let client = ScriptedClient::replying(vec![]);
        let controller = ViewController::new(client.clone());
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedImage::from_file("image/jpeg", 100, dir.path().join("revoked.jpg"));

        let err = controller.select(file).await.unwrap_err();

        assert!(matches!(err, LeafError::ReadFailure { .. }));
        assert_eq!(controller.snapshot().phase(), Phase::Failed);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn new_attempt_clears_error() {
        let client = ScriptedClient::replying(vec![
            Err(AnalysisError::Unavailable),
            Ok("Recovered.".into()),
        ]);
        let controller = ViewController::new(client);

        assert!(controller.select(png_upload()).await.is_err());
        assert!(controller.snapshot().error.is_some());

        controller.reanalyze().await.unwrap();
        let ui = controller.snapshot();
        assert_eq!(ui.error, None);
        assert_eq!(ui.analysis.as_deref(), Some("Recovered."));
    }

    #[tokio::test]
    async fn reject_records_error_unless_busy() {
        let client = ScriptedClient::gated(Ok("Done.".into()));
        let controller = Arc::new(ViewController::new(client.clone()));

        let e = controller.reject(LeafError::ReadFailure { detail: "eof".into() });
        assert!(matches!(e, LeafError::ReadFailure { .. }));
        assert_eq!(controller.snapshot().error, Some(e.to_string()));

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.select(png_upload()).await }
        });
        let (entered, release) = client.gate.as_ref().unwrap();
        entered.notified().await;

        let e = controller.reject(LeafError::ReadFailure { detail: "eof".into() });
        assert_eq!(e, LeafError::Busy);
        assert_eq!(controller.snapshot().error, None);

        release.notify_one();
        pending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn reanalyze_without_image_is_rejected() {
        let controller = ViewController::new(ScriptedClient::replying(vec![]));
        assert_eq!(controller.reanalyze().await, Err(LeafError::NoImage));
        assert_eq!(controller.snapshot().phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn second_request_while_loading_is_busy() {
        let client = ScriptedClient::gated(Ok("Done.".into()));
        let controller = Arc::new(ViewController::new(client.clone()));

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.select(png_upload()).await }
        });
        let (entered, release) = client.gate.as_ref().unwrap();
        entered.notified().await;

        assert!(controller.snapshot().loading);
        assert_eq!(controller.reanalyze().await, Err(LeafError::Busy));
        assert_eq!(controller.select(png_upload()).await, Err(LeafError::Busy));
        assert_eq!(controller.snapshot().error, None);

        release.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(client.calls(), 1);
        assert_eq!(controller.snapshot().phase(), Phase::Loaded);
    }

    #[tokio::test]
    async fn panic_in_client_leaves_loading() {
        let controller = Arc::new(ViewController::new(Arc::new(PanickingClient)));

        let joined = tokio::spawn({
            let controller = controller.clone();
            async move { controller.select(png_upload()).await }
        })
        .await;
        assert!(joined.unwrap_err().is_panic());

        let ui = controller.snapshot();
        assert!(!ui.loading);
        assert_eq!(ui.phase(), Phase::Failed);
        assert_eq!(ui.error, Some(LeafError::Interrupted.to_string()));
        assert!(ui.image.is_some());

        // The guard is released: the next request runs instead of being Busy.
        let joined = tokio::spawn({
            let controller = controller.clone();
            async move { controller.reanalyze().await }
        })
        .await;
        assert!(joined.unwrap_err().is_panic());
        assert!(!controller.snapshot().loading);
    }

    #[tokio::test]
    async fn dropped_transition_fails_as_interrupted() {
        let client = ScriptedClient::gated(Ok("Never seen.".into()));
        let controller = Arc::new(ViewController::new(client.clone()));

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.select(png_upload()).await }
        });
        client.gate.as_ref().unwrap().0.notified().await;
        assert!(controller.snapshot().loading);

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        let ui = controller.snapshot();
        assert!(!ui.loading);
        assert_eq!(ui.error, Some(LeafError::Interrupted.to_string()));
    }

    #[tokio::test]
    async fn bootstrap_loads_default_pair_without_service() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("default.png");
        std::fs::write(&asset, PNG_MAGIC).unwrap();
        let client = ScriptedClient::replying(vec![]);
        let controller = ViewController::new(client.clone());

        controller.bootstrap(&asset).await.unwrap();

        let ui = controller.snapshot();
        assert_eq!(ui.phase(), Phase::Loaded);
        let image = ui.image.unwrap();
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image, EncodedImage::from_bytes("image/png", PNG_MAGIC));
        assert_eq!(ui.analysis.as_deref(), Some(DEFAULT_ANALYSIS));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_image_asset() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("default.png");
        std::fs::write(&asset, b"<html>not found</html>").unwrap();
        let controller = ViewController::new(ScriptedClient::replying(vec![]));

        let err = controller.bootstrap(&asset).await.unwrap_err();

        assert!(matches!(err, LeafError::Bootstrap { .. }));
        let ui = controller.snapshot();
        assert_eq!(ui.phase(), Phase::Failed);
        assert_eq!(ui.image, None);
    }

    #[tokio::test]
    async fn bootstrap_missing_asset_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let controller = ViewController::new(ScriptedClient::replying(vec![]));
        let err = controller.bootstrap(&dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, LeafError::Bootstrap { .. }));
        assert!(controller.snapshot().error.unwrap().contains("default leaf example"));
    }
}
