//! Core types for mask composition operations

use crate::error::{MaskEditError, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Boolean pixel grid stored as `(height, width)`
///
/// Every mask in the crate (raw proposals, catalog regions, strokes and the
/// current edit mask) is a `BoolMask`. Dimensions are reported as
/// `(width, height)` to match the `image` crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolMask {
    data: Array2<bool>,
}

impl BoolMask {
    /// Create an all-false mask
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: Array2::from_elem((height as usize, width as usize), false),
        }
    }

    /// Create a mask with every pixel set
    #[must_use]
    pub fn filled(width: u32, height: u32) -> Self {
        Self {
            data: Array2::from_elem((height as usize, width as usize), true),
        }
    }

    /// Wrap an existing `(height, width)` array
    #[must_use]
    pub fn from_array(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// Build a mask from a per-pixel predicate called with `(x, y)`
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        Self {
            data: Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                f(x as u32, y as u32)
            }),
        }
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    /// Dimensions as `(width, height)`
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Pixel value at `(x, y)`; out-of-bounds reads are false
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Set the pixel at `(x, y)`; out-of-bounds writes are ignored
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if let Some(pixel) = self.data.get_mut((y as usize, x as usize)) {
            *pixel = value;
        }
    }

    /// Number of true pixels
    #[must_use]
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// True when no pixel is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    #[must_use]
    pub fn as_array(&self) -> &Array2<bool> {
        &self.data
    }

    #[must_use]
    pub fn into_array(self) -> Array2<bool> {
        self.data
    }

    /// Full boolean complement
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            data: self.data.mapv(|v| !v),
        }
    }

    /// Check that `other` has the same geometry
    ///
    /// # Errors
    /// - `GeometryMismatch` when the dimensions differ
    pub fn ensure_same_dimensions(&self, other: &Self, context: &str) -> Result<()> {
        if self.dimensions() == other.dimensions() {
            Ok(())
        } else {
            Err(MaskEditError::geometry_mismatch(
                context,
                self.dimensions(),
                other.dimensions(),
            ))
        }
    }

    /// Pixel-wise OR
    ///
    /// # Errors
    /// - `GeometryMismatch` when the dimensions differ
    pub fn union(&self, other: &Self) -> Result<Self> {
        self.ensure_same_dimensions(other, "mask union")?;
        Ok(Self {
            data: Zip::from(&self.data)
                .and(&other.data)
                .map_collect(|&a, &b| a || b),
        })
    }

    /// Pixel-wise `self AND NOT other`
    ///
    /// # Errors
    /// - `GeometryMismatch` when the dimensions differ
    pub fn subtract(&self, other: &Self) -> Result<Self> {
        self.ensure_same_dimensions(other, "mask subtraction")?;
        Ok(Self {
            data: Zip::from(&self.data)
                .and(&other.data)
                .map_collect(|&a, &b| a && !b),
        })
    }

    /// In-place OR, used when accumulating many regions
    ///
    /// # Errors
    /// - `GeometryMismatch` when the dimensions differ
    pub fn union_in_place(&mut self, other: &Self) -> Result<()> {
        self.ensure_same_dimensions(other, "mask union")?;
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|a, &b| *a = *a || b);
        Ok(())
    }

    /// Whether every true pixel of `other` is also true in `self`
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
            && Zip::from(&self.data)
                .and(&other.data)
                .all(|&a, &b| a || !b)
    }

    /// Coordinates of every true pixel, row-major
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.data
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|((y, x), _)| Point::new(x as u32, y as u32))
            .collect()
    }

    /// Single-channel export: true = 255, false = 0
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// RGB export: true = (255, 255, 255), false = (0, 0, 0)
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let value = if self.get(x, y) { 255 } else { 0 };
            Rgb([value, value, value])
        })
    }

    /// Any non-zero luma counts as set
    #[must_use]
    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y).0[0] != 0
        })
    }
}

/// Pixel coordinate in image space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unrefined region proposal straight from a segmentation backend
///
/// The mask is stored at the backend's native resolution and is never
/// mutated; the postprocessor consumes it to build a catalog region.
#[derive(Debug, Clone)]
pub struct RawMask {
    pub mask: BoolMask,
    pub confidence: Option<f32>,
}

impl RawMask {
    #[must_use]
    pub fn new(mask: BoolMask) -> Self {
        Self {
            mask,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_confidence(mask: BoolMask, confidence: f32) -> Self {
        Self {
            mask,
            confidence: Some(confidence),
        }
    }
}

/// Where a catalog region came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionOrigin {
    /// Postprocessed backend proposal, with its position in the backend output
    Segment { emission_index: usize },
    /// Synthetic canvas area added by a padding operation
    Padding,
}

/// Postprocessed, image-resolution region held by a [`crate::MaskCatalog`]
#[derive(Debug, Clone)]
pub struct Region {
    mask: BoolMask,
    area: usize,
    confidence: Option<f32>,
    origin: RegionOrigin,
}

impl Region {
    #[must_use]
    pub fn new(mask: BoolMask, origin: RegionOrigin, confidence: Option<f32>) -> Self {
        let area = mask.area();
        Self {
            mask,
            area,
            confidence,
            origin,
        }
    }

    #[must_use]
    pub fn padding(mask: BoolMask) -> Self {
        Self::new(mask, RegionOrigin::Padding, None)
    }

    #[must_use]
    pub fn mask(&self) -> &BoolMask {
        &self.mask
    }

    /// Count of true pixels, computed once at creation
    #[must_use]
    pub fn area(&self) -> usize {
        self.area
    }

    #[must_use]
    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    #[must_use]
    pub fn origin(&self) -> RegionOrigin {
        self.origin
    }

    #[must_use]
    pub fn is_padding(&self) -> bool {
        self.origin == RegionOrigin::Padding
    }
}

/// Whether the current mask holds any pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskState {
    Empty,
    Populated,
}

impl MaskState {
    #[must_use]
    pub fn of(mask: &BoolMask) -> Self {
        if mask.is_empty() {
            Self::Empty
        } else {
            Self::Populated
        }
    }
}

/// Result of a session operation: whether anything changed plus the new mask
///
/// `mask` is `None` when the operation was inert (no image loaded, no
/// catalog); callers use `changed` to decide whether to repaint.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub changed: bool,
    pub mask: Option<BoolMask>,
}

impl EditOutcome {
    /// Outcome of an operation that could not run
    #[must_use]
    pub fn inert() -> Self {
        Self {
            changed: false,
            mask: None,
        }
    }

    #[must_use]
    pub fn applied(changed: bool, mask: BoolMask) -> Self {
        Self {
            changed,
            mask: Some(mask),
        }
    }

    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.mask.is_none()
    }

    #[must_use]
    pub fn state(&self) -> Option<MaskState> {
        self.mask.as_ref().map(MaskState::of)
    }
}

/// Content identity of an image: SHA-256 over dimensions and pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFingerprint([u8; 32]);

impl ImageFingerprint {
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(image.width().to_le_bytes());
        hasher.update(image.height().to_le_bytes());
        hasher.update(image.as_raw());
        Self(hasher.finalize().into())
    }

    /// First eight bytes as lowercase hex, enough for file names and logs
    #[must_use]
    pub fn short_hex(&self) -> String {
        self.0
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl std::fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short_hex())
    }
}
