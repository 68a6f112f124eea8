//! Geometry checks between images and masks

use crate::{
    error::{MaskEditError, Result},
    types::BoolMask,
};
use image::RgbImage;

/// Validator for image/mask pairings
pub struct GeometryValidator;

impl GeometryValidator {
    /// Reject a mask whose dimensions differ from the image it belongs to
    pub fn ensure_mask_matches_image(image: &RgbImage, mask: &BoolMask, context: &str) -> Result<()> {
        if image.dimensions() == mask.dimensions() {
            Ok(())
        } else {
            Err(MaskEditError::geometry_mismatch(
                context,
                image.dimensions(),
                mask.dimensions(),
            ))
        }
    }

    /// Reject zero-sized images, which have no pixels to select
    pub fn ensure_non_empty(image: &RgbImage) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(MaskEditError::invalid_config(format!(
                "Image must have at least one pixel, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_geometry() {
        let image = RgbImage::new(32, 16);
        assert!(GeometryValidator::ensure_mask_matches_image(&image, &BoolMask::new(32, 16), "test").is_ok());
    }

    #[test]
    fn test_mismatched_geometry() {
        let image = RgbImage::new(32, 16);
        let err = GeometryValidator::ensure_mask_matches_image(&image, &BoolMask::new(16, 32), "stroke")
            .unwrap_err();
        assert!(matches!(
            err,
            MaskEditError::GeometryMismatch {
                expected_width: 32,
                expected_height: 16,
                actual_width: 16,
                actual_height: 32,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(GeometryValidator::ensure_non_empty(&RgbImage::new(0, 10)).is_err());
        assert!(GeometryValidator::ensure_non_empty(&RgbImage::new(1, 1)).is_ok());
    }
}
