//! Area-preserving resampling of boolean masks
//!
//! Each target pixel takes the fraction of its footprint covered by set
//! source pixels. Downscaling averages whole blocks; upscaling spreads a
//! source pixel over several targets and blends only along boundaries.
//! Only fully covered targets stay set, so partial edge pixels drop out.

use crate::types::BoolMask;
use ndarray::Array2;

/// Coverage at which a resampled pixel counts as set (full coverage, less
/// float accumulation error)
pub const COVERAGE_THRESHOLD: f32 = 1.0 - 1e-6;

/// Area interpolation for masks
pub struct AreaResampler;

impl AreaResampler {
    /// Resample `mask` to `(target_width, target_height)` and threshold
    /// the coverage at [`COVERAGE_THRESHOLD`]
    #[must_use]
    pub fn resize(mask: &BoolMask, target_width: u32, target_height: u32) -> BoolMask {
        if mask.dimensions() == (target_width, target_height) {
            return mask.clone();
        }
        let coverage = Self::coverage(mask, target_width, target_height);
        BoolMask::from_array(coverage.mapv(|c| c >= COVERAGE_THRESHOLD))
    }

    /// Fractional coverage in `[0, 1]` for each target pixel, shape
    /// `(target_height, target_width)`
    #[must_use]
    pub fn coverage(mask: &BoolMask, target_width: u32, target_height: u32) -> Array2<f32> {
        let (src_w, src_h) = mask.dimensions();
        let target_w = target_width as usize;
        let target_h = target_height as usize;
        if src_w == 0 || src_h == 0 || target_w == 0 || target_h == 0 {
            return Array2::zeros((target_h, target_w));
        }

        let weights_x = Self::axis_weights(src_w as usize, target_w);
        let weights_y = Self::axis_weights(src_h as usize, target_h);
        let source = mask.as_array();

        // Horizontal pass: (src_h, target_w)
        let mut horizontal = Array2::<f32>::zeros((src_h as usize, target_w));
        for (row, mut out_row) in source.rows().into_iter().zip(horizontal.rows_mut()) {
            for (out, taps) in out_row.iter_mut().zip(&weights_x) {
                *out = taps
                    .iter()
                    .filter(|(index, _)| row[*index])
                    .map(|(_, weight)| weight)
                    .sum();
            }
        }

        // Vertical pass: (target_h, target_w)
        let mut output = Array2::<f32>::zeros((target_h, target_w));
        for (mut out_row, taps) in output.rows_mut().into_iter().zip(&weights_y) {
            for &(index, weight) in taps {
                out_row.scaled_add(weight, &horizontal.row(index));
            }
        }

        output
    }

    /// For every target index, the source indices it overlaps and the share of
    /// the target footprint each one covers (shares sum to one)
    fn axis_weights(source_len: usize, target_len: usize) -> Vec<Vec<(usize, f32)>> {
        let scale = source_len as f64 / target_len as f64;
        (0..target_len)
            .map(|i| {
                let start = i as f64 * scale;
                let end = (i + 1) as f64 * scale;
                let first = start.floor() as usize;
                let last = (end.ceil() as usize).min(source_len);
                (first..last)
                    .filter_map(|j| {
                        let overlap = (end.min((j + 1) as f64) - start.max(j as f64)) / scale;
                        (overlap > 1e-9).then_some((j, overlap as f32))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_resize() {
        let mask = BoolMask::from_fn(8, 6, |x, y| x > y);
        assert_eq!(AreaResampler::resize(&mask, 8, 6), mask);
    }

    #[test]
    fn test_upscale_block_exactly() {
        let mut mask = BoolMask::new(4, 4);
        mask.set(1, 1, true);
        let resized = AreaResampler::resize(&mask, 16, 16);
        assert_eq!(resized.dimensions(), (16, 16));
        assert_eq!(resized.area(), 16);
        assert!(resized.get(4, 4));
        assert!(resized.get(7, 7));
        assert!(!resized.get(8, 8));
    }

    #[test]
    fn test_downscale_averages_blocks() {
        // Left half set: every 2x2 block is fully set or fully clear
        let mask = BoolMask::from_fn(8, 8, |x, _| x < 4);
        let coverage = AreaResampler::coverage(&mask, 4, 4);
        assert!((coverage[[0, 0]] - 1.0).abs() < 1e-6);
        assert!(coverage[[0, 3]].abs() < 1e-6);

        let resized = AreaResampler::resize(&mask, 4, 4);
        assert_eq!(resized.area(), 8);
    }

    #[test]
    fn test_non_integer_scale_keeps_shape() {
        let mask = BoolMask::from_fn(33, 17, |x, y| (x + y) % 3 == 0);
        for (w, h) in [(100, 40), (7, 5), (1, 1), (64, 64)] {
            let resized = AreaResampler::resize(&mask, w, h);
            assert_eq!(resized.dimensions(), (w, h));
        }
    }

    #[test]
    fn test_coverage_preserves_area() {
        let mask = BoolMask::from_fn(10, 10, |x, y| x < 3 && y < 7);
        let coverage = AreaResampler::coverage(&mask, 7, 13);
        let scale = (10.0 * 10.0) / (7.0 * 13.0);
        let total: f32 = coverage.iter().sum::<f32>() * scale;
        assert!((total - 21.0).abs() < 1e-3);
    }

    #[test]
    fn test_half_covered_pixel_is_cleared() {
        let mask = BoolMask::from_fn(4, 1, |x, _| x < 3);
        let coverage = AreaResampler::coverage(&mask, 2, 1);
        assert!((coverage[[0, 1]] - 0.5).abs() < 1e-6);

        let resized = AreaResampler::resize(&mask, 2, 1);
        assert!(resized.get(0, 0));
        assert!(!resized.get(1, 0));
    }

    #[test]
    fn test_downscaled_strip_keeps_only_full_columns() {
        // 21 columns halve to 10 full columns plus one half-covered column
        let mask = BoolMask::from_fn(40, 40, |x, _| x < 21);
        let resized = AreaResampler::resize(&mask, 20, 20);
        let columns = (0..20).filter(|&x| resized.get(x, 0)).count();
        assert_eq!(columns, 10);
        assert_eq!(resized.area(), 10 * 20);
    }

    #[test]
    fn test_empty_target() {
        let mask = BoolMask::filled(4, 4);
        assert_eq!(AreaResampler::resize(&mask, 0, 3).dimensions(), (0, 3));
    }
}
