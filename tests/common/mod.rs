//! Shared helpers for integration tests
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use segment_edit::{BoolMask, RawMask, Result, SegmentationBackend, SegmentationStyle};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::{Receiver, Sender},
    Mutex,
};

/// Axis-aligned rectangle `[x0, x1) x [y0, y1)`
pub fn rect(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> BoolMask {
    BoolMask::from_fn(width, height, |x, y| (x0..x1).contains(&x) && (y0..y1).contains(&y))
}

/// Horizontal gradient so fingerprints differ between sizes and contents
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 96])
    })
}

/// Returns the same masks for every image and records each call's style
pub struct StaticSegmenter {
    masks: Vec<RawMask>,
    calls: AtomicUsize,
    styles: Mutex<Vec<SegmentationStyle>>,
}

impl StaticSegmenter {
    pub fn new(masks: Vec<BoolMask>) -> Self {
        Self {
            masks: masks.into_iter().map(RawMask::new).collect(),
            calls: AtomicUsize::new(0),
            styles: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn styles(&self) -> Vec<SegmentationStyle> {
        self.styles.lock().unwrap().clone()
    }
}

impl SegmentationBackend for StaticSegmenter {
    fn name(&self) -> &str {
        "static"
    }

    fn generate(&self, _image: &RgbImage, style: SegmentationStyle) -> Result<Vec<RawMask>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.styles.lock().unwrap().push(style);
        Ok(self.masks.clone())
    }
}

/// Announces that it started, then blocks until released
///
/// Lets a test change the session while segmentation is in flight.
pub struct GatedSegmenter {
    masks: Vec<RawMask>,
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl GatedSegmenter {
    pub fn new(masks: Vec<BoolMask>, started: Sender<()>, release: Receiver<()>) -> Self {
        Self {
            masks: masks.into_iter().map(RawMask::new).collect(),
            started: Mutex::new(started),
            release: Mutex::new(release),
        }
    }
}

impl SegmentationBackend for GatedSegmenter {
    fn name(&self) -> &str {
        "gated"
    }

    fn generate(&self, _image: &RgbImage, _style: SegmentationStyle) -> Result<Vec<RawMask>> {
        self.started.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(self.masks.clone())
    }
}
