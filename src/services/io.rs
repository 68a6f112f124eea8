//! Image and mask file I/O
//!
//! Keeps file handling out of the session so edit logic stays testable
//! without a filesystem.

use crate::{
    config::MaskFormat,
    error::{MaskEditError, Result},
    services::format::MaskFormatHandler,
    types::{BoolMask, ImageFingerprint},
    utils::{GeometryValidator, NumericValidator},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::{
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Service for reading and writing images and masks
pub struct MaskIOService;

impl MaskIOService {
    /// Load an image file as RGB8
    ///
    /// Falls back to content sniffing when the extension is missing or
    /// wrong.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use segment_edit::services::MaskIOService;
    ///
    /// let image = MaskIOService::load_image("photo.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        Ok(Self::load_dynamic(path.as_ref())?.to_rgb8())
    }

    fn load_dynamic(path: &Path) -> Result<DynamicImage> {
        if !path.exists() {
            return Err(MaskEditError::file_io_error(
                "read image file",
                path,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path) {
            Ok(image) => Ok(image),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Extension-based loading failed, sniffing content");
                let data = std::fs::read(path)
                    .map_err(|io_err| MaskEditError::file_io_error("read image data", path, &io_err))?;
                image::load_from_memory(&data).map_err(|content_err| {
                    MaskEditError::processing(format!(
                        "Failed to decode '{}': {} (content sniffing: {})",
                        path.display(),
                        e,
                        content_err
                    ))
                })
            }
        }
    }

    /// Encode a mask as PNG bytes
    pub fn encode_png(mask: &BoolMask, format: MaskFormat) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        MaskFormatHandler::to_image(mask, format).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Decode any image as a mask: a pixel is set when its first channel is
    /// non-zero
    pub fn decode_mask(bytes: &[u8]) -> Result<BoolMask> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::mask_from_image(&image))
    }

    fn mask_from_image(image: &DynamicImage) -> BoolMask {
        let rgba = image.to_rgba8();
        BoolMask::from_fn(rgba.width(), rgba.height(), |x, y| rgba.get_pixel(x, y).0[0] != 0)
    }

    /// Write `mask` as PNG, creating parent directories
    pub fn save_mask<P: AsRef<Path>>(mask: &BoolMask, path: P, format: MaskFormat) -> Result<()> {
        let path = path.as_ref();
        Self::ensure_parent(path)?;
        MaskFormatHandler::to_image(mask, format).save_with_format(path, ImageFormat::Png)?;
        info!(path = %path.display(), area = mask.area(), format = %format, "Mask saved");
        Ok(())
    }

    /// Read a mask file written by [`Self::save_mask`] or any other tool
    pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<BoolMask> {
        Ok(Self::mask_from_image(&Self::load_dynamic(path.as_ref())?))
    }

    /// Write an RGB or RGBA result image, creating parent directories
    pub fn save_image<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path = path.as_ref();
        Self::ensure_parent(path)?;
        image.save(path)?;
        debug!(path = %path.display(), "Image saved");
        Ok(())
    }

    /// Image with the mask as its alpha channel: unselected pixels become
    /// fully transparent
    pub fn alpha_image(image: &RgbImage, mask: &BoolMask) -> Result<RgbaImage> {
        GeometryValidator::ensure_mask_matches_image(image, mask, "alpha cutout")?;
        Ok(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            image::Rgba([r, g, b, if mask.get(x, y) { 255 } else { 0 }])
        }))
    }

    /// `image * (1 - alpha) + mask * alpha`, with the mask rendered white on
    /// black
    pub fn overlay_preview(image: &RgbImage, mask: &BoolMask, alpha: f32) -> Result<RgbImage> {
        GeometryValidator::ensure_mask_matches_image(image, mask, "selection preview")?;
        let alpha = NumericValidator::validate_fraction(alpha, "overlay alpha")?;
        Ok(RgbImage::from_fn(image.width(), image.height(), |x, y| {
            let overlay = if mask.get(x, y) { 255.0 } else { 0.0 };
            let Rgb(channels) = *image.get_pixel(x, y);
            Rgb(channels.map(|c| (f32::from(c) * (1.0 - alpha) + overlay * alpha).round() as u8))
        }))
    }

    /// `<timestamp>_<fingerprint>` used to group the files of one edit
    #[must_use]
    pub fn savename_prefix(fingerprint: &ImageFingerprint) -> String {
        format!(
            "{}_{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            fingerprint.short_hex()
        )
    }

    /// `<dir>/<prefix>_<suffix>.png`
    #[must_use]
    pub fn output_path(dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
        dir.join(format!("{}_{}.png", prefix, suffix))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| MaskEditError::file_io_error("create output directory", parent, &e))?;
        }
        Ok(())
    }
}
