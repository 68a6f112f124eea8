//! Single-image editing session
//!
//! A [`Session`] holds exactly one image together with its catalog, its
//! padding region and the current mask. Loading a new image discards the
//! catalog and padding; the mask survives only when the new image has the
//! same dimensions. Starting a segmentation run, switching segmenter and
//! switching style mode all drop the catalog.
//!
//! Operations that produce a mask return an [`EditOutcome`] and degrade to an
//! inert outcome when there is no image or no catalog. Operations that
//! produce an image return `NoActiveSession` / `EmptyCatalog` errors instead,
//! which callers can recognise with [`MaskEditError::is_inert`]. Geometry
//! mismatches are always loud and never mutate state.

use crate::{
    catalog::MaskCatalog,
    config::EditorConfig,
    editor::MaskEditor,
    error::{MaskEditError, Result},
    inference::{SegmentationBackend, SegmentationStyle},
    padding::{self, PaddingOptions},
    postprocess::RawMaskPostprocessor,
    selection::{SelectionCompositor, SelectionOptions},
    services::MaskIOService,
    tracing_config::{events, spans},
    types::{BoolMask, EditOutcome, ImageFingerprint, MaskState, Point},
    utils::GeometryValidator,
};
use image::RgbImage;
use instant::Instant;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

/// Result of loading an image into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// The current mask was replaced by an all-false mask of the new size
    pub mask_reset: bool,
    pub fingerprint: ImageFingerprint,
    /// Counter identifying this image; bumps on every load or padding
    pub generation: u64,
}

/// Immutable copy of what generation collaborators need
#[derive(Debug, Clone)]
pub struct EditSnapshot {
    pub image: Arc<RgbImage>,
    pub mask: BoolMask,
    pub fingerprint: ImageFingerprint,
}

/// Work captured under the lock for an out-of-lock segmentation run
#[derive(Debug, Clone)]
pub struct SegmentationJob {
    image: Arc<RgbImage>,
    generation: u64,
    style: SegmentationStyle,
    postprocessor: RawMaskPostprocessor,
}

impl SegmentationJob {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn image(&self) -> &Arc<RgbImage> {
        &self.image
    }

    #[must_use]
    pub fn style(&self) -> SegmentationStyle {
        self.style
    }

    /// Run the backend and build a catalog at the image resolution
    ///
    /// # Errors
    /// - `BackendFailure` wrapping whatever the backend raised
    pub fn run(&self, backend: &dyn SegmentationBackend) -> Result<MaskCatalog> {
        let span = spans::segmentation(backend.name(), self.image.dimensions());
        let _enter = span.enter();

        let start = Instant::now();
        debug!(style = %self.style, "Requesting mask proposals");
        let raw_masks = backend.generate(&self.image, self.style).map_err(|e| {
            error!(backend = backend.name(), error = %e, "Segmentation backend failed");
            match e {
                MaskEditError::BackendFailure { .. } => e,
                other => MaskEditError::backend_failure(backend.name(), other),
            }
        })?;
        let catalog = MaskCatalog::build(&raw_masks, self.image.dimensions(), &self.postprocessor);
        events::performance_metric("segmentation", start.elapsed().as_millis() as u64);
        Ok(catalog)
    }
}

/// How a finished segmentation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationCommit {
    /// Catalog installed with this many regions (padding included)
    Committed { regions: usize },
    /// The image changed while the backend ran; result dropped
    Stale,
}

/// The one active editing session
#[derive(Debug, Clone, Default)]
pub struct Session {
    image: Option<Arc<RgbImage>>,
    /// Image as uploaded, before any padding
    original: Option<Arc<RgbImage>>,
    fingerprint: Option<ImageFingerprint>,
    generation: u64,
    catalog: Option<MaskCatalog>,
    padding: Option<BoolMask>,
    editor: Option<MaskEditor>,
    postprocessor: RawMaskPostprocessor,
    /// Name of the backend whose proposals the catalog holds
    segmenter: Option<String>,
    style: SegmentationStyle,
}

impl Session {
    #[must_use]
    pub fn new(postprocessor: RawMaskPostprocessor) -> Self {
        Self {
            postprocessor,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(RawMaskPostprocessor::new(config.postprocess))
    }

    /// Make `image` the active image
    ///
    /// Always drops the catalog and padding. The mask is reset to all-false
    /// when there is none yet or its size differs from the new image.
    ///
    /// # Errors
    /// - `InvalidConfig` for a zero-sized image
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn load_image(&mut self, image: RgbImage) -> Result<LoadOutcome> {
        GeometryValidator::ensure_non_empty(&image)?;
        let image = Arc::new(image);
        self.original = Some(Arc::clone(&image));
        self.padding = None;
        let outcome = self.install_image(image);
        info!(
            image = %outcome.fingerprint,
            mask_reset = outcome.mask_reset,
            "Image loaded"
        );
        Ok(outcome)
    }

    /// Pad the uploaded image and make the result the active image
    ///
    /// Padding always starts from the image as uploaded, so repeated calls do
    /// not compound. The border becomes the padding region.
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    /// - `InvalidConfig` for out-of-range options
    #[instrument(skip(self))]
    pub fn apply_padding(&mut self, options: &PaddingOptions) -> Result<LoadOutcome> {
        let original = self
            .original
            .clone()
            .ok_or_else(|| MaskEditError::no_active_session("apply padding"))?;
        let padded = padding::pad(&original, options)?;

        let outcome = self.install_image(Arc::new(padded.image));
        self.padding = if padded.region.is_empty() {
            None
        } else {
            Some(padded.region)
        };
        Ok(outcome)
    }

    fn install_image(&mut self, image: Arc<RgbImage>) -> LoadOutcome {
        let dimensions = image.dimensions();
        let fingerprint = ImageFingerprint::of(&image);

        let mask_reset = match &self.editor {
            Some(editor) => editor.dimensions() != dimensions,
            None => true,
        };
        if mask_reset {
            self.editor = Some(MaskEditor::new(dimensions.0, dimensions.1));
        }

        self.generation += 1;
        self.image = Some(image);
        self.fingerprint = Some(fingerprint);
        self.catalog = None;

        LoadOutcome {
            mask_reset,
            fingerprint,
            generation: self.generation,
        }
    }

    /// Store or clear the padding region; an existing catalog is updated so
    /// padding stays first in lookup order
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    /// - `GeometryMismatch` when the region differs from the image
    pub fn set_padding(&mut self, region: Option<BoolMask>) -> Result<()> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| MaskEditError::no_active_session("set padding"))?;
        if let Some(mask) = &region {
            GeometryValidator::ensure_mask_matches_image(image, mask, "padding region")?;
        }

        if let Some(catalog) = self.catalog.take() {
            self.catalog = Some(catalog.insert_padding(region.as_ref())?);
        }
        self.padding = region;
        Ok(())
    }

    /// Drop the catalog; the next selection is inert until segmentation runs
    /// again
    pub fn reset_catalog(&mut self) {
        if self.catalog.take().is_some() {
            debug!("Catalog discarded");
        }
    }

    /// Record the active segmenter; switching to another one drops the
    /// catalog since its regions came from the previous model
    pub fn set_segmenter(&mut self, name: &str) -> bool {
        if self.segmenter.as_deref() == Some(name) {
            return false;
        }
        info!(previous = ?self.segmenter, segmenter = name, "Segmenter switched");
        self.segmenter = Some(name.to_string());
        self.reset_catalog();
        true
    }

    /// Record the style passed to the segmenter; a different style drops
    /// the catalog since its regions were proposed under the old one
    pub fn set_style_mode(&mut self, style: SegmentationStyle) -> bool {
        if self.style == style {
            return false;
        }
        info!(previous = %self.style, style = %style, "Style mode switched");
        self.style = style;
        self.reset_catalog();
        true
    }

    /// Start a segmentation run: drop the current catalog and capture what an
    /// out-of-lock run needs
    ///
    /// Image, mask and padding are left alone. Without an image nothing
    /// changes and `None` is returned.
    pub fn segmentation_job(&mut self) -> Option<SegmentationJob> {
        let image = Arc::clone(self.image.as_ref()?);
        self.reset_catalog();
        Some(SegmentationJob {
            image,
            generation: self.generation,
            style: self.style,
            postprocessor: self.postprocessor.clone(),
        })
    }

    /// Install a catalog built from the image of `generation`
    ///
    /// The current padding region is inserted first. Results for an image
    /// that has since been replaced are dropped.
    ///
    /// # Errors
    /// - `GeometryMismatch` when the catalog does not match the image
    pub fn commit_catalog(&mut self, generation: u64, catalog: MaskCatalog) -> Result<SegmentationCommit> {
        if generation != self.generation || self.image.is_none() {
            warn!(
                job_generation = generation,
                session_generation = self.generation,
                "Discarding stale segmentation result"
            );
            return Ok(SegmentationCommit::Stale);
        }

        if let Some(image) = &self.image {
            if image.dimensions() != catalog.dimensions() {
                return Err(MaskEditError::geometry_mismatch(
                    "segmentation catalog",
                    image.dimensions(),
                    catalog.dimensions(),
                ));
            }
        }

        let catalog = catalog.insert_padding(self.padding.as_ref())?;
        let regions = catalog.len();
        info!(regions, padded = catalog.has_padding(), "Catalog ready");
        self.catalog = Some(catalog);
        Ok(SegmentationCommit::Committed { regions })
    }

    /// Segment the active image in place
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    /// - `BackendFailure` when the backend fails; the previous catalog is
    ///   already gone but image, mask and padding are untouched
    pub fn run_segmentation(&mut self, backend: &dyn SegmentationBackend) -> Result<SegmentationCommit> {
        let job = self
            .segmentation_job()
            .ok_or_else(|| MaskEditError::no_active_session("run segmentation"))?;
        let catalog = job.run(backend)?;
        self.commit_catalog(job.generation, catalog)
    }

    /// Replace the current mask with the regions hit by `points`
    ///
    /// Inert without an image or catalog.
    #[instrument(skip(self, points), fields(points = points.len()))]
    pub fn select(&mut self, points: &[Point], options: SelectionOptions) -> EditOutcome {
        let (Some(catalog), Some(editor)) = (&self.catalog, &mut self.editor) else {
            debug!("Selection ignored: no catalog");
            return EditOutcome::inert();
        };

        let selected = SelectionCompositor::select(points, options, catalog);
        match editor.replace(selected) {
            Ok(changed) => EditOutcome::applied(changed, editor.mask().clone()),
            Err(e) => {
                // catalog and editor share the image geometry
                error!(error = %e, "Selection geometry diverged from mask");
                EditOutcome::inert()
            }
        }
    }

    /// [`Self::select`] using every set pixel of `stroke` as a point
    ///
    /// # Errors
    /// - `GeometryMismatch` when the stroke differs from the image
    pub fn select_stroke(&mut self, stroke: &BoolMask, options: SelectionOptions) -> Result<EditOutcome> {
        if let Some(image) = &self.image {
            GeometryValidator::ensure_mask_matches_image(image, stroke, "selection stroke")?;
        }
        Ok(self.select(&stroke.points(), options))
    }

    /// Dilate the current mask; iterations clamp to 1-100
    pub fn expand(&mut self, iterations: u32) -> EditOutcome {
        let _span = spans::edit_operation("expand").entered();
        match (&self.image, &mut self.editor) {
            (Some(_), Some(editor)) => {
                let changed = editor.expand(iterations);
                EditOutcome::applied(changed, editor.mask().clone())
            }
            _ => EditOutcome::inert(),
        }
    }

    /// Remove stroke pixels from the current mask
    ///
    /// # Errors
    /// - `GeometryMismatch` when the stroke differs from the mask
    pub fn trim(&mut self, stroke: &BoolMask) -> Result<EditOutcome> {
        let _span = spans::edit_operation("trim").entered();
        match (&self.image, &mut self.editor) {
            (Some(_), Some(editor)) => {
                let changed = editor.trim(stroke)?;
                Ok(EditOutcome::applied(changed, editor.mask().clone()))
            }
            _ => Ok(EditOutcome::inert()),
        }
    }

    /// Add stroke pixels to the current mask
    ///
    /// # Errors
    /// - `GeometryMismatch` when the stroke differs from the mask
    pub fn add(&mut self, stroke: &BoolMask) -> Result<EditOutcome> {
        let _span = spans::edit_operation("add").entered();
        match (&self.image, &mut self.editor) {
            (Some(_), Some(editor)) => {
                let changed = editor.add(stroke)?;
                Ok(EditOutcome::applied(changed, editor.mask().clone()))
            }
            _ => Ok(EditOutcome::inert()),
        }
    }

    /// Overwrite the current mask, e.g. with an imported file
    ///
    /// # Errors
    /// - `GeometryMismatch` when the mask differs from the image
    pub fn replace_mask(&mut self, mask: BoolMask) -> Result<EditOutcome> {
        match (&self.image, &mut self.editor) {
            (Some(_), Some(editor)) => {
                let changed = editor.replace(mask)?;
                Ok(EditOutcome::applied(changed, editor.mask().clone()))
            }
            _ => Ok(EditOutcome::inert()),
        }
    }

    /// Copy image and mask for a generation backend
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    pub fn snapshot(&self) -> Result<EditSnapshot> {
        match (&self.image, &self.editor, self.fingerprint) {
            (Some(image), Some(editor), Some(fingerprint)) => Ok(EditSnapshot {
                image: Arc::clone(image),
                mask: editor.mask().clone(),
                fingerprint,
            }),
            _ => Err(MaskEditError::no_active_session("snapshot")),
        }
    }

    /// Catalog regions painted over the image
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    /// - `EmptyCatalog` before segmentation
    pub fn color_overlay(&self, alpha: f32) -> Result<RgbImage> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| MaskEditError::no_active_session("color overlay"))?;
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| MaskEditError::empty_catalog("color overlay"))?;
        catalog.render_color_overlay(image, alpha)
    }

    /// Current mask blended over the image
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    pub fn selection_preview(&self, alpha: f32) -> Result<RgbImage> {
        let snapshot = self.snapshot()?;
        MaskIOService::overlay_preview(&snapshot.image, &snapshot.mask, alpha)
    }

    #[must_use]
    pub fn image(&self) -> Option<&Arc<RgbImage>> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn original_image(&self) -> Option<&Arc<RgbImage>> {
        self.original.as_ref()
    }

    #[must_use]
    pub fn fingerprint(&self) -> Option<ImageFingerprint> {
        self.fingerprint
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn catalog(&self) -> Option<&MaskCatalog> {
        self.catalog.as_ref()
    }

    #[must_use]
    pub fn padding(&self) -> Option<&BoolMask> {
        self.padding.as_ref()
    }

    #[must_use]
    pub fn current_mask(&self) -> Option<&BoolMask> {
        self.editor.as_ref().map(MaskEditor::mask)
    }

    #[must_use]
    pub fn mask_state(&self) -> Option<MaskState> {
        self.editor.as_ref().map(MaskEditor::state)
    }

    #[must_use]
    pub fn postprocessor(&self) -> &RawMaskPostprocessor {
        &self.postprocessor
    }

    #[must_use]
    pub fn segmenter(&self) -> Option<&str> {
        self.segmenter.as_deref()
    }

    #[must_use]
    pub fn style_mode(&self) -> SegmentationStyle {
        self.style
    }
}

/// Session shared between tasks
///
/// Mutations are serialised by an async mutex: a second caller waits rather
/// than interleaving. Segmentation runs the backend on a blocking thread with
/// the lock released and commits only if the image is unchanged.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Exclusive access for multi-step edits
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }

    /// # Errors
    /// See [`Session::load_image`]
    pub async fn load_image(&self, image: RgbImage) -> Result<LoadOutcome> {
        self.inner.lock().await.load_image(image)
    }

    /// # Errors
    /// See [`Session::apply_padding`]
    pub async fn apply_padding(&self, options: &PaddingOptions) -> Result<LoadOutcome> {
        self.inner.lock().await.apply_padding(options)
    }

    pub async fn reset_catalog(&self) {
        self.inner.lock().await.reset_catalog();
    }

    pub async fn set_segmenter(&self, name: &str) -> bool {
        self.inner.lock().await.set_segmenter(name)
    }

    pub async fn set_style_mode(&self, style: SegmentationStyle) -> bool {
        self.inner.lock().await.set_style_mode(style)
    }

    pub async fn select(&self, points: &[Point], options: SelectionOptions) -> EditOutcome {
        self.inner.lock().await.select(points, options)
    }

    pub async fn expand(&self, iterations: u32) -> EditOutcome {
        self.inner.lock().await.expand(iterations)
    }

    /// # Errors
    /// See [`Session::trim`]
    pub async fn trim(&self, stroke: &BoolMask) -> Result<EditOutcome> {
        self.inner.lock().await.trim(stroke)
    }

    /// # Errors
    /// See [`Session::add`]
    pub async fn add(&self, stroke: &BoolMask) -> Result<EditOutcome> {
        self.inner.lock().await.add(stroke)
    }

    /// # Errors
    /// See [`Session::snapshot`]
    pub async fn snapshot(&self) -> Result<EditSnapshot> {
        self.inner.lock().await.snapshot()
    }

    /// Segment the current image without holding the lock during inference
    ///
    /// The old catalog is dropped before the lock is released, so selections
    /// made while the backend runs are inert.
    ///
    /// # Errors
    /// - `NoActiveSession` without an image
    /// - `BackendFailure` when the backend fails
    /// - `Processing` when the blocking task panics
    pub async fn run_segmentation(&self, backend: Arc<dyn SegmentationBackend>) -> Result<SegmentationCommit> {
        let job = self
            .inner
            .lock()
            .await
            .segmentation_job()
            .ok_or_else(|| MaskEditError::no_active_session("run segmentation"))?;
        let generation = job.generation();

        let catalog = tokio::task::spawn_blocking(move || job.run(backend.as_ref()))
            .await
            .map_err(|e| MaskEditError::processing(format!("Segmentation task failed: {}", e)))??;

        self.inner.lock().await.commit_catalog(generation, catalog)
    }
}
