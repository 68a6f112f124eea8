//! Utility modules for mask arithmetic
//!
//! Morphology, resampling, colour and validation helpers used by the
//! postprocessor, catalog and editor.

pub mod color;
pub mod morphology;
pub mod resample;
pub mod validation;

pub use color::RegionPalette;
pub use morphology::Morphology;
pub use resample::AreaResampler;
pub use validation::{GeometryValidator, NumericValidator};
