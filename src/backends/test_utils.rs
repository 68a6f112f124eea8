//! Mock backends for unit tests
//!
//! These stand in for neural segmentation and generation models so session,
//! catalog and generation logic can be tested without weights.

use crate::{
    error::{MaskEditError, Result},
    generation::{GenerationBackend, GenerationKind, GenerationParams},
    inference::{SegmentationBackend, SegmentationStyle},
    types::{BoolMask, RawMask},
};
use async_trait::async_trait;
use image::{GrayImage, Rgb, RgbImage};
use std::sync::{Arc, Mutex};

/// Mock segmentation backend
///
/// Without configured masks it proposes two regions for any image: the left
/// half and a centred block a quarter of each side.
#[derive(Debug, Clone)]
pub struct MockSegmenter {
    name: String,
    masks: Option<Vec<RawMask>>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl MockSegmenter {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            masks: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Always return `masks`, whatever the image
    #[must_use]
    pub fn with_masks(name: &str, masks: Vec<RawMask>) -> Self {
        let mut backend = Self::new(name);
        backend.masks = Some(masks);
        backend
    }

    /// A backend whose every call fails
    #[must_use]
    pub fn new_failing(name: &str) -> Self {
        let mut backend = Self::new(name);
        backend.should_fail = true;
        backend
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(call);
        }
    }

    fn default_masks(width: u32, height: u32) -> Vec<RawMask> {
        let left_half = BoolMask::from_fn(width, height, |x, _| x < width / 2);
        let (bw, bh) = (width / 4, height / 4);
        let (x0, y0) = ((width - bw) / 2, (height - bh) / 2);
        let block = BoolMask::from_fn(width, height, |x, y| {
            (x0..x0 + bw).contains(&x) && (y0..y0 + bh).contains(&y)
        });
        vec![RawMask::new(block), RawMask::with_confidence(left_half, 0.95)]
    }
}

impl SegmentationBackend for MockSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, image: &RgbImage, style: SegmentationStyle) -> Result<Vec<RawMask>> {
        self.record_call(format!("generate {}x{} {}", image.width(), image.height(), style));
        if self.should_fail {
            return Err(MaskEditError::processing("Mock segmentation failed"));
        }
        Ok(self
            .masks
            .clone()
            .unwrap_or_else(|| Self::default_masks(image.width(), image.height())))
    }
}

/// Mock generation backend: inverts the image inside the mask
#[derive(Debug, Clone)]
pub struct MockGenerator {
    name: String,
    kind: GenerationKind,
    call_history: Arc<Mutex<Vec<String>>>,
    seeds: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl MockGenerator {
    #[must_use]
    pub fn new(name: &str, kind: GenerationKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            call_history: Arc::new(Mutex::new(Vec::new())),
            seeds: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    #[must_use]
    pub fn new_failing(name: &str, kind: GenerationKind) -> Self {
        let mut backend = Self::new(name, kind);
        backend.should_fail = true;
        backend
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Seed parameter seen by each call, in order
    pub fn seen_seeds(&self) -> Vec<String> {
        self.seeds.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> GenerationKind {
        self.kind
    }

    async fn run(&self, image: &RgbImage, mask: &GrayImage, params: &GenerationParams) -> Result<RgbImage> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(format!("run {}x{}", image.width(), image.height()));
        }
        if let (Ok(mut seeds), Some(seed)) = (self.seeds.lock(), params.get(GenerationParams::SEED)) {
            seeds.push(seed.to_string());
        }
        if self.should_fail {
            return Err(MaskEditError::processing("Mock generation failed"));
        }

        Ok(RgbImage::from_fn(image.width(), image.height(), |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            if mask.get_pixel(x, y).0[0] > 127 {
                Rgb([255 - r, 255 - g, 255 - b])
            } else {
                Rgb([r, g, b])
            }
        }))
    }
}
