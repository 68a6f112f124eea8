//! Region colours and blending helpers

use image::Rgb;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Deterministic pseudo-random colours keyed by region index
pub struct RegionPalette;

impl RegionPalette {
    /// Colour for the region at `index`; the same index always yields the
    /// same colour
    #[must_use]
    pub fn color(index: usize) -> Rgb<u8> {
        let mut rng = StdRng::seed_from_u64(index as u64);
        // Keep channels away from black so regions stay visible on dark images
        Rgb([
            rng.gen_range(MIN_CHANNEL..=u8::MAX),
            rng.gen_range(MIN_CHANNEL..=u8::MAX),
            rng.gen_range(MIN_CHANNEL..=u8::MAX),
        ])
    }

    /// `base * (1 - alpha) + overlay * alpha`, per channel
    #[must_use]
    pub fn blend(base: Rgb<u8>, overlay: Rgb<u8>, alpha: f32) -> Rgb<u8> {
        let alpha = alpha.clamp(0.0, 1.0);
        let mix = |b: u8, o: u8| {
            (f32::from(b) * (1.0 - alpha) + f32::from(o) * alpha)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([
            mix(base.0[0], overlay.0[0]),
            mix(base.0[1], overlay.0[1]),
            mix(base.0[2], overlay.0[2]),
        ])
    }
}

const MIN_CHANNEL: u8 = 48;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_stable() {
        for index in 0..64 {
            assert_eq!(RegionPalette::color(index), RegionPalette::color(index));
        }
        assert_ne!(RegionPalette::color(0), RegionPalette::color(1));
    }

    #[test]
    fn test_palette_avoids_black() {
        for index in 0..256 {
            let Rgb([r, g, b]) = RegionPalette::color(index);
            assert!(r >= 48 && g >= 48 && b >= 48);
        }
    }

    #[test]
    fn test_blend_endpoints() {
        let base = Rgb([10, 20, 30]);
        let overlay = Rgb([200, 100, 0]);
        assert_eq!(RegionPalette::blend(base, overlay, 0.0), base);
        assert_eq!(RegionPalette::blend(base, overlay, 1.0), overlay);
        assert_eq!(RegionPalette::blend(Rgb([0, 0, 0]), Rgb([255, 255, 255]), 0.5), Rgb([128, 128, 128]));
    }
}
