//! Raw mask cleanup
//!
//! Turns a backend proposal at model resolution into a crisp region at image
//! resolution: area resize, then close, then open.

use crate::{
    config::PostprocessConfig,
    types::{BoolMask, RawMask, Region, RegionOrigin},
    utils::{AreaResampler, Morphology},
};
use tracing::instrument;

/// Cleans individual raw instance masks
#[derive(Debug, Clone, Default)]
pub struct RawMaskPostprocessor {
    config: PostprocessConfig,
}

impl RawMaskPostprocessor {
    #[must_use]
    pub fn new(config: PostprocessConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Resize `raw_mask` to `(target_height, target_width)` and strip noise
    ///
    /// Closing runs before opening so small solid regions survive while
    /// thin noise goes away. A result with zero area is still returned.
    #[must_use]
    #[instrument(
        level = "trace",
        skip(self, raw_mask),
        fields(source = %format!("{}x{}", raw_mask.mask.width(), raw_mask.mask.height()))
    )]
    pub fn postprocess(&self, raw_mask: &RawMask, target_height: u32, target_width: u32) -> BoolMask {
        let resized = AreaResampler::resize(&raw_mask.mask, target_width, target_height);
        let closed = Morphology::close(&resized, self.config.close_kernel);
        Morphology::open(&closed, self.config.open_kernel)
    }

    /// Postprocess and wrap the result as a catalog region
    #[must_use]
    pub fn postprocess_region(
        &self,
        raw_mask: &RawMask,
        emission_index: usize,
        target_height: u32,
        target_width: u32,
    ) -> Region {
        let mask = self.postprocess(raw_mask, target_height, target_width);
        Region::new(
            mask,
            RegionOrigin::Segment { emission_index },
            raw_mask.confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(width: u32, height: u32, x0: u32, y0: u32, side: u32) -> BoolMask {
        BoolMask::from_fn(width, height, |x, y| {
            (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y)
        })
    }

    #[test]
    fn test_output_has_target_shape() {
        let postprocessor = RawMaskPostprocessor::default();
        let raw = RawMask::new(square(64, 64, 10, 10, 30));
        for (h, w) in [(480, 640), (17, 33), (64, 64), (1, 1)] {
            let mask = postprocessor.postprocess(&raw, h, w);
            assert_eq!(mask.dimensions(), (w, h));
        }
    }

    #[test]
    fn test_speckle_removed_and_body_kept() {
        let postprocessor = RawMaskPostprocessor::default();
        let mut raw = square(100, 100, 20, 20, 40);
        // isolated noise well away from the body
        raw.set(90, 90, true);
        raw.set(91, 90, true);
        let mask = postprocessor.postprocess(&RawMask::new(raw), 100, 100);

        assert!(!mask.get(90, 90));
        assert!(mask.get(40, 40));
        assert_eq!(mask.area(), 40 * 40);
    }

    #[test]
    fn test_single_pixel_hole_filled() {
        let postprocessor = RawMaskPostprocessor::default();
        let mut raw = square(50, 50, 10, 10, 20);
        raw.set(20, 20, false);
        let mask = postprocessor.postprocess(&RawMask::new(raw), 50, 50);
        assert!(mask.get(20, 20));
    }

    #[test]
    fn test_zero_area_result_is_kept() {
        let postprocessor = RawMaskPostprocessor::default();
        // a 3x3 blob is narrower than the 7x7 opening element
        let raw = RawMask::with_confidence(square(40, 40, 5, 5, 3), 0.9);
        let region = postprocessor.postprocess_region(&raw, 4, 40, 40);
        assert_eq!(region.area(), 0);
        assert_eq!(region.origin(), RegionOrigin::Segment { emission_index: 4 });
        assert_eq!(region.confidence(), Some(0.9));
    }

    #[test]
    fn test_upscale_from_model_resolution() {
        let postprocessor = RawMaskPostprocessor::default();
        // model resolution is a quarter of the image
        let raw = RawMask::new(square(32, 32, 8, 8, 16));
        let mask = postprocessor.postprocess(&raw, 128, 128);
        assert_eq!(mask.area(), 64 * 64);
        assert!(mask.get(32, 32));
        assert!(!mask.get(31, 31));
    }
}
