//! Glue between a finished mask and generative backends
//!
//! Inpainting and object-removal models are black boxes here. This module
//! prepares their inputs (sizes divisible by eight), derives per-iteration
//! seeds and optionally composites the result back over the source so only
//! the masked area changes.

use crate::{
    error::{MaskEditError, Result},
    session::EditSnapshot,
    types::BoolMask,
    utils::Morphology,
};
use async_trait::async_trait;
use image::{imageops, imageops::FilterType, GrayImage, Rgb, RgbImage};
use instant::Instant;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

/// Largest seed handed to a backend
pub const MAX_SEED: u32 = 2_147_483_647;

/// Dilation applied to the mask before compositing
const COMPOSITE_DILATE_ITERATIONS: usize = 4;
const COMPOSITE_BLUR_SIGMA: f32 = 3.0;

/// What a generation backend does with the masked area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// Prompt-driven repainting; seeded
    Inpaint,
    /// Object removal; deterministic
    Cleanup,
}

/// Image-to-image model driven by a mask
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> GenerationKind;

    /// Produce a new image; `mask` is 255 where content should change
    ///
    /// # Errors
    /// - Any backend failure
    async fn run(&self, image: &RgbImage, mask: &GrayImage, params: &GenerationParams) -> Result<RgbImage>;
}

/// Opaque key/value parameters forwarded to a backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    values: BTreeMap<String, String>,
}

impl GenerationParams {
    pub const SEED: &'static str = "seed";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn set<K: Into<String>, V: ToString>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.to_string());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Requested seed; missing or unparsable values count as "random"
    #[must_use]
    pub fn seed(&self) -> i64 {
        self.get(Self::SEED)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(-1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `key: value` pairs joined by commas, for PNG text chunks and logs
    #[must_use]
    pub fn infotext(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One backend output and the seed it was produced with
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub image: RgbImage,
    pub seed: Option<u32>,
}

/// Seeds for `iterations` runs: the requested seed first when it is
/// non-negative, a fresh draw for every other run
#[must_use]
pub fn iteration_seeds(requested: i64, iterations: u32) -> Vec<u32> {
    iteration_seeds_with(requested, iterations, &mut rand::thread_rng())
}

/// [`iteration_seeds`] drawing fresh seeds from `rng`
#[must_use]
pub fn iteration_seeds_with<R: Rng + ?Sized>(requested: i64, iterations: u32, rng: &mut R) -> Vec<u32> {
    (0..iterations)
        .map(|count| {
            if count == 0 && (0..=i64::from(MAX_SEED)).contains(&requested) {
                requested as u32
            } else {
                rng.gen_range(0..=MAX_SEED)
            }
        })
        .collect()
}

/// Scale down and centre-crop so both sides are multiples of eight
///
/// The image and mask are treated identically. Inputs that already fit are
/// returned unchanged.
///
/// # Errors
/// - `GeometryMismatch` when the mask differs from the image
/// - `InvalidConfig` when a side is shorter than eight pixels
pub fn fit_to_multiple_of_eight(image: &RgbImage, mask: &GrayImage) -> Result<(RgbImage, GrayImage)> {
    if image.dimensions() != mask.dimensions() {
        return Err(MaskEditError::geometry_mismatch(
            "generation mask",
            image.dimensions(),
            mask.dimensions(),
        ));
    }

    let (width, height) = image.dimensions();
    let new_width = width / 8 * 8;
    let new_height = height / 8 * 8;
    if new_width == 0 || new_height == 0 {
        return Err(MaskEditError::invalid_config(format!(
            "Image {}x{} is too small for generation (minimum 8x8)",
            width, height
        )));
    }
    if new_width == width && new_height == height {
        return Ok((image.clone(), mask.clone()));
    }

    let scale_w = f64::from(new_width) / f64::from(width);
    let scale_h = f64::from(new_height) / f64::from(height);
    let scale = scale_w.max(scale_h);
    let resize_width = (f64::from(width) * scale + 0.5) as u32;
    let resize_height = (f64::from(height) * scale + 0.5) as u32;

    let (mut image, mut mask) = (image.clone(), mask.clone());
    if (resize_width, resize_height) != (width, height) {
        info!(
            from = %format!("{}x{}", width, height),
            to = %format!("{}x{}", resize_width, resize_height),
            "Resizing for generation"
        );
        image = imageops::resize(&image, resize_width, resize_height, FilterType::Lanczos3);
        mask = imageops::resize(&mask, resize_width, resize_height, FilterType::Lanczos3);
    }

    if (resize_width, resize_height) != (new_width, new_height) {
        let left = ((f64::from(resize_width) - f64::from(new_width)) / 2.0).round() as u32;
        let top = ((f64::from(resize_height) - f64::from(new_height)) / 2.0).round() as u32;
        image = imageops::crop_imm(&image, left, top, new_width, new_height).to_image();
        mask = imageops::crop_imm(&mask, left, top, new_width, new_height).to_image();
    }

    Ok((image, mask))
}

/// Keep `original` outside the mask and `generated` inside it, with a
/// widened, blurred transition
///
/// # Errors
/// - `GeometryMismatch` when the three inputs disagree
pub fn composite_masked_area(generated: &RgbImage, original: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
    for (context, dims) in [("generated image", generated.dimensions()), ("composite mask", mask.dimensions())] {
        if dims != original.dimensions() {
            return Err(MaskEditError::geometry_mismatch(context, original.dimensions(), dims));
        }
    }

    let widened = Morphology::dilate(&BoolMask::from_gray_image(mask), 3, COMPOSITE_DILATE_ITERATIONS);
    let weights = imageops::blur(&widened.to_gray_image(), COMPOSITE_BLUR_SIGMA);

    Ok(RgbImage::from_fn(original.width(), original.height(), |x, y| {
        let alpha = f32::from(weights.get_pixel(x, y).0[0]) / 255.0;
        let g = generated.get_pixel(x, y).0;
        let o = original.get_pixel(x, y).0;
        let mix = |g: u8, o: u8| (f32::from(g) * alpha + f32::from(o) * (1.0 - alpha)).round() as u8;
        Rgb([mix(g[0], o[0]), mix(g[1], o[1]), mix(g[2], o[2])])
    }))
}

/// Run a backend once per seed on a snapshot taken from the session
///
/// Runs outside any session lock. Backend errors are logged and returned as
/// `BackendFailure`; the session is never touched.
///
/// # Errors
/// - Input preparation failures from [`fit_to_multiple_of_eight`]
/// - `BackendFailure` from the backend
#[instrument(skip_all, fields(backend = backend.name(), image = %snapshot.fingerprint))]
pub async fn run_generation(
    backend: &dyn GenerationBackend,
    snapshot: &EditSnapshot,
    params: &GenerationParams,
    iterations: u32,
    composite: bool,
) -> Result<Vec<GeneratedImage>> {
    let (image, mask) = fit_to_multiple_of_eight(&snapshot.image, &snapshot.mask.to_gray_image())?;

    let seeds: Vec<Option<u32>> = match backend.kind() {
        GenerationKind::Inpaint => iteration_seeds(params.seed(), iterations.max(1))
            .into_iter()
            .map(Some)
            .collect(),
        GenerationKind::Cleanup => {
            if iterations > 1 {
                warn!(iterations, "Cleanup backends are deterministic, running once");
            }
            vec![None]
        }
    };

    let mut outputs = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let mut run_params = params.clone();
        if let Some(seed) = seed {
            run_params.set(GenerationParams::SEED, seed);
        }

        let start = Instant::now();
        let generated = backend
            .run(&image, &mask, &run_params)
            .await
            .map_err(|e| {
                error!(error = %e, "Generation backend failed");
                match e {
                    MaskEditError::BackendFailure { .. } => e,
                    other => MaskEditError::backend_failure(backend.name(), other),
                }
            })?;
        info!(
            seed = ?seed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generation finished"
        );

        if generated.dimensions() != image.dimensions() {
            return Err(MaskEditError::backend_failure(
                backend.name(),
                format!(
                    "returned {}x{} for a {}x{} input",
                    generated.width(),
                    generated.height(),
                    image.width(),
                    image.height()
                ),
            ));
        }

        let image = if composite {
            composite_masked_area(&generated, &image, &mask)?
        } else {
            generated
        };
        outputs.push(GeneratedImage { image, seed });
    }
    Ok(outputs)
}
