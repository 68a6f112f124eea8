//! Configuration types for mask composition sessions

use crate::{
    error::{MaskEditError, Result},
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted expand iteration count; larger requests are clamped
pub const MAX_EXPAND_ITERATIONS: u32 = 100;

/// Exported mask channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskFormat {
    /// Single-channel luma, true = 255
    #[default]
    Gray,
    /// Three identical channels, true = (255, 255, 255)
    Rgb,
}

impl std::fmt::Display for MaskFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gray => write!(f, "gray"),
            Self::Rgb => write!(f, "rgb"),
        }
    }
}

/// Morphology applied to every raw backend mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostprocessConfig {
    /// Square closing element; fills holes up to this size
    pub close_kernel: usize,
    /// Square opening element; removes specks smaller than this size
    pub open_kernel: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            close_kernel: 3,
            open_kernel: 7,
        }
    }
}

impl PostprocessConfig {
    /// # Errors
    /// - Kernel sizes that are zero or even
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_kernel_size(self.close_kernel, "close kernel")?;
        NumericValidator::validate_kernel_size(self.open_kernel, "open kernel")?;
        Ok(())
    }
}

/// Configuration for a mask editing session and its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Segmentation backend used for new catalogs
    pub segmentation_model_id: String,

    /// Generative inpainting backend
    pub inpaint_model_id: String,

    /// Object-removal backend
    pub cleaner_model_id: String,

    /// Raw mask cleanup parameters
    pub postprocess: PostprocessConfig,

    /// Weight of region colours / mask over the image in previews (0.0-1.0)
    pub overlay_alpha: f32,

    /// Default for selections: clicks on unclaimed pixels select nothing
    pub ignore_background: bool,

    /// Default expand iteration count (clamped to 1-100 when applied)
    pub expand_iterations: u32,

    /// Write the segmentation colour overlay after every run
    pub save_segmentation: bool,

    /// Where masks, overlays and generated images are written
    pub output_dir: PathBuf,

    /// Exported mask layout
    pub mask_format: MaskFormat,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            segmentation_model_id: "sam_vit_l_0b3195.pth".to_string(),
            inpaint_model_id: "runwayml/stable-diffusion-inpainting".to_string(),
            cleaner_model_id: "lama".to_string(),
            postprocess: PostprocessConfig::default(),
            overlay_alpha: 0.5,
            ignore_background: true,
            expand_iterations: 1,
            save_segmentation: false,
            output_dir: PathBuf::from("outputs"),
            mask_format: MaskFormat::Gray,
        }
    }
}

impl EditorConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segment_edit::EditorConfig;
    ///
    /// let config = EditorConfig::builder()
    ///     .overlay_alpha(0.4)
    ///     .ignore_background(false)
    ///     .build()
    ///     .unwrap();
    /// assert!(!config.ignore_background);
    /// ```
    #[must_use]
    pub fn builder() -> EditorConfigBuilder {
        EditorConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Overlay alpha outside 0.0-1.0
    /// - Expand iterations outside 1-100
    /// - Even or zero morphology kernel sizes
    /// - Empty segmentation model id
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_fraction(self.overlay_alpha, "overlay alpha")?;
        NumericValidator::validate_range(
            self.expand_iterations,
            1,
            MAX_EXPAND_ITERATIONS,
            "expand iterations",
        )?;
        self.postprocess.validate()?;
        if self.segmentation_model_id.trim().is_empty() {
            return Err(MaskEditError::invalid_config(
                "segmentation model id must not be empty",
            ));
        }
        Ok(())
    }

    /// Default location: `<config dir>/segment-edit/config.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("segment-edit").join("config.json"))
    }

    /// Load a configuration file; a missing file yields the defaults
    ///
    /// # Errors
    /// - File exists but cannot be read
    /// - Invalid JSON or invalid values
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MaskEditError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            MaskEditError::invalid_config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories
    ///
    /// # Errors
    /// - Directory creation or file write failures
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MaskEditError::file_io_error("create config directory", parent, &e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MaskEditError::processing(format!("serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| MaskEditError::file_io_error("write config file", path, &e))
    }

    /// Record the segmentation model a user picked so the next session
    /// starts with it; returns whether the value changed
    pub fn remember_segmentation_model(&mut self, model_id: &str) -> bool {
        if self.segmentation_model_id == model_id {
            return false;
        }
        self.segmentation_model_id = model_id.to_string();
        true
    }
}

/// Builder for `EditorConfig`
#[derive(Debug, Default)]
pub struct EditorConfigBuilder {
    config: EditorConfig,
}

impl EditorConfigBuilder {
    #[must_use]
    pub fn segmentation_model_id<S: Into<String>>(mut self, model_id: S) -> Self {
        self.config.segmentation_model_id = model_id.into();
        self
    }

    #[must_use]
    pub fn inpaint_model_id<S: Into<String>>(mut self, model_id: S) -> Self {
        self.config.inpaint_model_id = model_id.into();
        self
    }

    #[must_use]
    pub fn cleaner_model_id<S: Into<String>>(mut self, model_id: S) -> Self {
        self.config.cleaner_model_id = model_id.into();
        self
    }

    #[must_use]
    pub fn postprocess(mut self, postprocess: PostprocessConfig) -> Self {
        self.config.postprocess = postprocess;
        self
    }

    #[must_use]
    pub fn overlay_alpha(mut self, alpha: f32) -> Self {
        self.config.overlay_alpha = alpha;
        self
    }

    #[must_use]
    pub fn ignore_background(mut self, ignore: bool) -> Self {
        self.config.ignore_background = ignore;
        self
    }

    /// Set default expand iterations (clamped to 1-100)
    #[must_use]
    pub fn expand_iterations(mut self, iterations: u32) -> Self {
        self.config.expand_iterations =
            NumericValidator::clamp_to_range(iterations, 1, MAX_EXPAND_ITERATIONS);
        self
    }

    #[must_use]
    pub fn save_segmentation(mut self, save: bool) -> Self {
        self.config.save_segmentation = save;
        self
    }

    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn mask_format(mut self, format: MaskFormat) -> Self {
        self.config.mask_format = format;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any value rejected by [`EditorConfig::validate`]
    pub fn build(self) -> Result<EditorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
