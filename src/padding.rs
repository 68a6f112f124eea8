//! Canvas padding for outpainting
//!
//! Grows the image by a scale factor on each axis and fills the new border.
//! The border is reported as a mask so the catalog can offer it as a
//! selectable region.

use crate::{
    error::{MaskEditError, Result},
    types::BoolMask,
    utils::{GeometryValidator, NumericValidator},
};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument};

/// Smallest and largest accepted scale factor per axis
pub const MIN_PAD_SCALE: f64 = 1.0;
pub const MAX_PAD_SCALE: f64 = 1.5;

/// Grey used by [`PaddingMode::Constant`]
pub const CONSTANT_FILL: u8 = 127;

/// How border pixels are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    /// Flat mid-grey
    Constant,
    /// Repeat the outermost row or column
    #[default]
    Edge,
    /// Mirror without repeating the edge pixel
    Reflect,
    /// Mirror including the edge pixel
    Symmetric,
    /// Tile the image
    Wrap,
}

impl PaddingMode {
    /// Source index for a padded coordinate `i` measured from the original
    /// origin (negative on the leading border)
    fn source_index(self, i: i64, len: usize) -> usize {
        let len = len as i64;
        let mapped = match self {
            Self::Constant | Self::Edge => i.clamp(0, len - 1),
            Self::Reflect if len == 1 => 0,
            Self::Reflect => {
                let period = 2 * (len - 1);
                let m = i.rem_euclid(period);
                if m >= len {
                    period - m
                } else {
                    m
                }
            }
            Self::Symmetric => {
                let period = 2 * len;
                let m = i.rem_euclid(period);
                if m >= len {
                    period - 1 - m
                } else {
                    m
                }
            }
            Self::Wrap => i.rem_euclid(len),
        };
        mapped as usize
    }
}

impl std::fmt::Display for PaddingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::Edge => "edge",
            Self::Reflect => "reflect",
            Self::Symmetric => "symmetric",
            Self::Wrap => "wrap",
        };
        f.write_str(name)
    }
}

impl FromStr for PaddingMode {
    type Err = MaskEditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "constant" => Ok(Self::Constant),
            "edge" => Ok(Self::Edge),
            "reflect" => Ok(Self::Reflect),
            "symmetric" => Ok(Self::Symmetric),
            "wrap" => Ok(Self::Wrap),
            other => Err(MaskEditError::invalid_config(format!(
                "Unknown padding mode '{}' (expected constant, edge, reflect, symmetric or wrap)",
                other
            ))),
        }
    }
}

/// Padding request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddingOptions {
    /// New width as a multiple of the original (1.0-1.5)
    pub scale_width: f64,
    /// New height as a multiple of the original (1.0-1.5)
    pub scale_height: f64,
    /// Share of the added width placed on the left (0.0-1.0)
    pub lr_balance: f64,
    /// Share of the added height placed on top (0.0-1.0)
    pub tb_balance: f64,
    pub mode: PaddingMode,
}

impl Default for PaddingOptions {
    fn default() -> Self {
        Self {
            scale_width: 1.0,
            scale_height: 1.0,
            lr_balance: 0.5,
            tb_balance: 0.5,
            mode: PaddingMode::Edge,
        }
    }
}

impl PaddingOptions {
    /// # Errors
    /// - Scale factors outside 1.0-1.5
    /// - Balances outside 0.0-1.0
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_range(self.scale_width, MIN_PAD_SCALE, MAX_PAD_SCALE, "padding width scale")?;
        NumericValidator::validate_range(self.scale_height, MIN_PAD_SCALE, MAX_PAD_SCALE, "padding height scale")?;
        NumericValidator::validate_range(self.lr_balance, 0.0, 1.0, "left/right balance")?;
        NumericValidator::validate_range(self.tb_balance, 0.0, 1.0, "top/bottom balance")?;
        Ok(())
    }

    /// Border sizes as `(left, right, top, bottom)` for an image of the
    /// given size; new sizes truncate toward zero in double precision
    #[must_use]
    pub fn borders(&self, width: u32, height: u32) -> Borders {
        let padded_width = (f64::from(width) * self.scale_width) as u32;
        let padded_height = (f64::from(height) * self.scale_height) as u32;
        let extra_w = padded_width.saturating_sub(width);
        let extra_h = padded_height.saturating_sub(height);
        let left = (f64::from(extra_w) * self.lr_balance) as u32;
        let top = (f64::from(extra_h) * self.tb_balance) as u32;
        Borders {
            left,
            right: extra_w - left,
            top,
            bottom: extra_h - top,
        }
    }
}

/// Pixels added on each side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Borders {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Borders {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Padded image plus the mask of the added border
#[derive(Debug, Clone)]
pub struct PaddedImage {
    pub image: RgbImage,
    /// True on every pixel that was not part of the original image
    pub region: BoolMask,
    pub borders: Borders,
}

/// Pad `image` according to `options`
///
/// # Errors
/// - Invalid options
/// - Zero-sized input image
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn pad(image: &RgbImage, options: &PaddingOptions) -> Result<PaddedImage> {
    options.validate()?;
    GeometryValidator::ensure_non_empty(image)?;

    let (width, height) = image.dimensions();
    let borders = options.borders(width, height);
    let padded_width = width + borders.left + borders.right;
    let padded_height = height + borders.top + borders.bottom;
    info!(
        from = %format!("{}x{}", width, height),
        to = %format!("{}x{}", padded_width, padded_height),
        mode = %options.mode,
        "Padding image"
    );

    let inside = |x: u32, y: u32| {
        (borders.left..borders.left + width).contains(&x) && (borders.top..borders.top + height).contains(&y)
    };

    let padded = RgbImage::from_fn(padded_width, padded_height, |x, y| {
        if !inside(x, y) && options.mode == PaddingMode::Constant {
            return Rgb([CONSTANT_FILL; 3]);
        }
        let sx = options
            .mode
            .source_index(i64::from(x) - i64::from(borders.left), width as usize);
        let sy = options
            .mode
            .source_index(i64::from(y) - i64::from(borders.top), height as usize);
        *image.get_pixel(sx as u32, sy as u32)
    });
    let region = BoolMask::from_fn(padded_width, padded_height, |x, y| !inside(x, y));

    Ok(PaddedImage {
        image: padded,
        region,
        borders,
    })
}
