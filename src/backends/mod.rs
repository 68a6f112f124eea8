//! Segmentation backend implementations
//!
//! Neural models live outside this crate and plug in through
//! [`crate::inference::SegmentationBackend`]. This module provides:
//! - a file-based backend serving precomputed masks
//! - mock backends for unit tests

pub mod directory;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

pub use self::directory::MaskFileBackend;
