//! Mask export layouts
//!
//! Keeps channel layout decisions out of the session and CLI code.

use crate::{config::MaskFormat, types::BoolMask};
use image::{ColorType, DynamicImage};

/// Service for converting masks into exportable images
pub struct MaskFormatHandler;

impl MaskFormatHandler {
    /// Render `mask` in the requested layout (true = 255 on every channel)
    ///
    /// # Examples
    /// ```rust
    /// use segment_edit::{services::MaskFormatHandler, BoolMask, MaskFormat};
    ///
    /// let mask = BoolMask::filled(4, 4);
    /// let image = MaskFormatHandler::to_image(&mask, MaskFormat::Rgb);
    /// assert_eq!(image.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    /// ```
    #[must_use]
    pub fn to_image(mask: &BoolMask, format: MaskFormat) -> DynamicImage {
        match format {
            MaskFormat::Gray => DynamicImage::ImageLuma8(mask.to_gray_image()),
            MaskFormat::Rgb => DynamicImage::ImageRgb8(mask.to_rgb_image()),
        }
    }

    /// Colour type written to disk for `format`
    #[must_use]
    pub fn color_type(format: MaskFormat) -> ColorType {
        match format {
            MaskFormat::Gray => ColorType::L8,
            MaskFormat::Rgb => ColorType::Rgb8,
        }
    }

    /// Masks are always written losslessly
    #[must_use]
    pub fn extension(_format: MaskFormat) -> &'static str {
        "png"
    }
}
