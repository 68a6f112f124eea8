//! Segmentation backend that reads precomputed masks from image files

use crate::{
    error::{MaskEditError, Result},
    inference::{SegmentationBackend, SegmentationStyle},
    services::MaskIOService,
    types::RawMask,
};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Extensions picked up by [`MaskFileBackend::from_dir`]
const MASK_EXTENSIONS: &[&str] = &["png", "bmp", "tif", "tiff", "jpg", "jpeg"];

/// Serves masks produced elsewhere (a notebook, another tool, a previous
/// run) as if a model had just proposed them
///
/// Each file becomes one raw mask: any non-zero pixel of its first channel
/// is set. Files may have any resolution; the postprocessor resizes them.
#[derive(Debug, Clone)]
pub struct MaskFileBackend {
    name: String,
    paths: Vec<PathBuf>,
}

impl MaskFileBackend {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, paths: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            paths,
        }
    }

    /// Every mask image directly inside `dir`, in file name order
    ///
    /// # Errors
    /// - The directory or one of its entries cannot be read
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| MaskEditError::file_io_error("read mask directory", dir, &e))?;
        let paths = Self::mask_paths(dir, entries.map(|entry| entry.map(|e| e.path())))?;

        let name = dir
            .file_name()
            .map_or_else(|| "masks".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, paths))
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Sorted mask files among `entries`; the first unreadable entry aborts
    fn mask_paths<I>(dir: &Path, entries: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = std::io::Result<PathBuf>>,
    {
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| MaskEditError::file_io_error("read mask directory entry", dir, &e))?;
            if path.is_file() && Self::has_mask_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn has_mask_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MASK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    fn load(path: &Path) -> Result<RawMask> {
        MaskIOService::load_mask(path).map(RawMask::new)
    }
}

impl SegmentationBackend for MaskFileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    /// Precomputed files already reflect whatever style produced them, so
    /// `style` is only logged
    #[instrument(skip(self, image), fields(backend = %self.name, files = self.paths.len()))]
    fn generate(&self, image: &RgbImage, style: SegmentationStyle) -> Result<Vec<RawMask>> {
        let masks = self
            .paths
            .iter()
            .map(|path| Self::load(path))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            masks = masks.len(),
            image = %format!("{}x{}", image.width(), image.height()),
            "Loaded mask files"
        );
        Ok(masks)
    }
}
