//! Binary morphology on boolean masks
//!
//! Square structuring elements only, applied through `imageproc` as
//! Chebyshev (`LInf`) balls: a `k`×`k` square is radius `(k - 1) / 2`.
//! Pixels outside the image never influence the result: dilation treats
//! them as unset and erosion treats them as set.

use crate::types::BoolMask;
use image::GrayImage;
use imageproc::{distance_transform::Norm, morphology};

/// Largest radius handed to `imageproc` in one call; distances saturate at 255
const MAX_STEP_RADIUS: u8 = 254;

/// Binary morphology operations with square structuring elements
pub struct Morphology;

impl Morphology {
    /// Dilate `mask` with a `kernel`×`kernel` square, `iterations` times
    ///
    /// Repeated dilation by a square of side `k` equals a single dilation by a
    /// square of side `iterations * (k - 1) + 1`, so the work is independent of
    /// the iteration count. Even kernels round down to the next odd side.
    #[must_use]
    pub fn dilate(mask: &BoolMask, kernel: usize, iterations: usize) -> BoolMask {
        match Self::radius(kernel, iterations) {
            0 => mask.clone(),
            radius => BoolMask::from_gray_image(&Self::dilate_gray(mask.to_gray_image(), radius)),
        }
    }

    /// Erode `mask` with a `kernel`×`kernel` square, `iterations` times
    #[must_use]
    pub fn erode(mask: &BoolMask, kernel: usize, iterations: usize) -> BoolMask {
        match Self::radius(kernel, iterations) {
            0 => mask.clone(),
            radius => BoolMask::from_gray_image(&Self::erode_gray(mask.to_gray_image(), radius)),
        }
    }

    /// Dilation followed by erosion: fills holes narrower than the kernel
    #[must_use]
    pub fn close(mask: &BoolMask, kernel: usize) -> BoolMask {
        match Self::single_step(mask, kernel) {
            Some(k) => BoolMask::from_gray_image(&morphology::close(&mask.to_gray_image(), Norm::LInf, k)),
            None => Self::erode(&Self::dilate(mask, kernel, 1), kernel, 1),
        }
    }

    /// Erosion followed by dilation: strips specks narrower than the kernel
    #[must_use]
    pub fn open(mask: &BoolMask, kernel: usize) -> BoolMask {
        match Self::single_step(mask, kernel) {
            Some(k) => BoolMask::from_gray_image(&morphology::open(&mask.to_gray_image(), Norm::LInf, k)),
            None => Self::dilate(&Self::erode(mask, kernel, 1), kernel, 1),
        }
    }

    /// Chebyshev radius of `iterations` passes with a `kernel`-wide square
    fn radius(kernel: usize, iterations: usize) -> usize {
        if kernel <= 1 {
            0
        } else {
            iterations.saturating_mul((kernel - 1) / 2)
        }
    }

    /// Radius for one `imageproc` open/close call, when that call is exact
    ///
    /// Pixels with no source in the image get distance `min(w + h, 255)`, so
    /// the radius has to stay below that for an all-set or all-clear
    /// intermediate to survive the second half.
    fn single_step(mask: &BoolMask, kernel: usize) -> Option<u8> {
        let (width, height) = mask.dimensions();
        let radius = Self::radius(kernel, 1);
        let k = u8::try_from(radius).ok()?;
        (radius > 0 && k <= MAX_STEP_RADIUS && radius < width as usize + height as usize).then_some(k)
    }

    /// Square dilations compose by adding radii, even when clipped to the
    /// image rectangle, so large radii run as several bounded steps
    fn dilate_gray(mut image: GrayImage, radius: usize) -> GrayImage {
        let mut remaining = radius.min(Self::extent(&image));
        // Without a set pixel every distance is the fill value, not a real one
        while remaining > 0 && image.pixels().any(|p| p.0[0] != 0) {
            let step = remaining.min(usize::from(MAX_STEP_RADIUS));
            image = morphology::dilate(&image, Norm::LInf, step as u8);
            remaining -= step;
        }
        image
    }

    fn erode_gray(mut image: GrayImage, radius: usize) -> GrayImage {
        let mut remaining = radius.min(Self::extent(&image));
        while remaining > 0 && image.pixels().any(|p| p.0[0] == 0) {
            let step = remaining.min(usize::from(MAX_STEP_RADIUS));
            image = morphology::erode(&image, Norm::LInf, step as u8);
            remaining -= step;
        }
        image
    }

    /// A radius this large already reaches every pixel from any pixel
    fn extent(image: &GrayImage) -> usize {
        image.width().max(image.height()) as usize
    }
}
