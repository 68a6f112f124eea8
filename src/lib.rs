#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # segment-edit
//!
//! Segmentation-guided mask composition for inpainting and object removal.
//!
//! A segmenter proposes many overlapping masks for an image. This crate turns
//! them into a catalog of regions where every pixel belongs to at most one
//! region, lets users build a selection by clicking regions, refines the
//! selection with expand, trim and add strokes, and hands an immutable
//! snapshot to generation backends.
//!
//! ## Features
//!
//! - **Region catalog**: deterministic ownership with larger regions claiming pixels first
//! - **Point selection**: click to select, optional background region and inversion
//! - **Mask editing**: dilation, stroke trimming and stroke addition with strict geometry checks
//! - **Outpainting canvas**: pad the image and expose the new border as a selectable region
//! - **Session concurrency**: async shared session where stale segmentation results are discarded
//! - **Pluggable backends**: segmentation and generation behind traits
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use segment_edit::{
//!     backends::MaskFileBackend, services::MaskIOService, EditorConfig, MaskFormat, Point,
//!     SelectionOptions, Session,
//! };
//!
//! # fn example() -> segment_edit::Result<()> {
//! let config = EditorConfig::default();
//! let mut session = Session::from_config(&config);
//! session.load_image(MaskIOService::load_image("photo.jpg")?)?;
//!
//! // Masks proposed by an external segmenter
//! let backend = MaskFileBackend::from_dir("masks")?;
//! session.run_segmentation(&backend)?;
//!
//! session.select(&[Point::new(120, 80)], SelectionOptions::default());
//! session.expand(config.expand_iterations);
//!
//! let snapshot = session.snapshot()?;
//! MaskIOService::save_mask(&snapshot.mask, "mask.png", MaskFormat::Gray)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, spinner and tracing subscriber setup
//! - `tracing-json`: JSON log output
//! - `tracing-files`: Log to a file through a non-blocking writer
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! segment-edit = { version = "0.1", default-features = false }
//! ```

pub mod backends;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod generation;
pub mod inference;
pub mod padding;
pub mod postprocess;
pub mod selection;
pub mod services;
pub mod session;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::MaskFileBackend;
pub use catalog::MaskCatalog;
pub use config::{EditorConfig, EditorConfigBuilder, MaskFormat, PostprocessConfig};
pub use editor::MaskEditor;
pub use error::{MaskEditError, Result};
pub use generation::{
    run_generation, GeneratedImage, GenerationBackend, GenerationKind, GenerationParams,
};
pub use inference::{SegmentationBackend, SegmentationStyle, SegmenterRegistry};
pub use padding::{pad, PaddedImage, PaddingMode, PaddingOptions};
pub use postprocess::RawMaskPostprocessor;
pub use selection::{SelectionCompositor, SelectionOptions};
pub use services::{MaskFormatHandler, MaskIOService};
pub use session::{
    EditSnapshot, LoadOutcome, SegmentationCommit, SegmentationJob, Session, SharedSession,
};
pub use types::{
    BoolMask, EditOutcome, ImageFingerprint, MaskState, Point, RawMask, Region, RegionOrigin,
};
pub use utils::{AreaResampler, GeometryValidator, Morphology, NumericValidator, RegionPalette};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat, TracingGuard, TracingOutput};
#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_compiles() {
        let config = EditorConfig::default();
        let session = Session::from_config(&config);
        assert!(session.current_mask().is_none());
        assert_eq!(session.generation(), 0);
    }
}
