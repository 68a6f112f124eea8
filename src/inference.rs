//! Segmentation backend abstraction and registry

use crate::{error::Result, types::RawMask};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};

/// Kind of picture being segmented
///
/// Backends may tune their proposal settings per style. Illustrations with
/// flat shading trade mask quality for more detected regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationStyle {
    /// Photographs and rendered scenes
    #[default]
    Photo,
    /// Anime and other flat-shaded illustration
    Anime,
}

impl SegmentationStyle {
    /// Style for an "anime style" toggle
    #[must_use]
    pub fn from_anime_flag(anime: bool) -> Self {
        if anime {
            Self::Anime
        } else {
            Self::Photo
        }
    }
}

impl fmt::Display for SegmentationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Anime => write!(f, "anime"),
        }
    }
}

/// Automatic mask generator
///
/// Implementations propose region masks for a whole image. No ordering is
/// assumed; the catalog sorts the proposals itself. Masks may come back at
/// the backend's native resolution.
pub trait SegmentationBackend: Send + Sync {
    /// Identifier used in logs and error messages
    fn name(&self) -> &str;

    /// Propose raw masks for `image`, tuned for `style`
    ///
    /// # Errors
    /// - Model loading or inference failures
    fn generate(&self, image: &RgbImage, style: SegmentationStyle) -> Result<Vec<RawMask>>;
}

/// Named segmentation backends, shared across sessions
#[derive(Clone, Default)]
pub struct SegmenterRegistry {
    backends: HashMap<String, Arc<dyn SegmentationBackend>>,
}

impl SegmenterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `name`, replacing any previous entry;
    /// returns whether a backend was replaced
    pub fn register(&mut self, name: &str, backend: Arc<dyn SegmentationBackend>) -> bool {
        self.backends.insert(name.to_string(), backend).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SegmentationBackend>> {
        self.backends.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl fmt::Debug for SegmenterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmenterRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
