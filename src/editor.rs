//! Boolean edits on the current mask

use crate::{
    config::MAX_EXPAND_ITERATIONS,
    error::Result,
    types::{BoolMask, MaskState},
    utils::{Morphology, NumericValidator},
};
use tracing::{debug, instrument};

/// Structuring element used by expand
const EXPAND_KERNEL: usize = 3;

/// Owner of the current edit mask
///
/// Geometry is fixed at creation; every stroke must match it. A failed
/// operation never mutates the mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskEditor {
    mask: BoolMask,
}

impl MaskEditor {
    /// All-false mask of the given size
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mask: BoolMask::new(width, height),
        }
    }

    #[must_use]
    pub fn from_mask(mask: BoolMask) -> Self {
        Self { mask }
    }

    #[must_use]
    pub fn mask(&self) -> &BoolMask {
        &self.mask
    }

    #[must_use]
    pub fn into_mask(self) -> BoolMask {
        self.mask
    }

    #[must_use]
    pub fn state(&self) -> MaskState {
        MaskState::of(&self.mask)
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    /// Replace the whole mask, as a fresh selection does
    ///
    /// # Errors
    /// - `GeometryMismatch` when `mask` differs from the current geometry
    pub fn replace(&mut self, mask: BoolMask) -> Result<bool> {
        self.mask.ensure_same_dimensions(&mask, "mask replacement")?;
        let changed = self.mask != mask;
        self.mask = mask;
        Ok(changed)
    }

    /// Dilate with a 3x3 square; `iterations` is clamped to 1-100
    ///
    /// An empty mask stays empty.
    #[instrument(level = "debug", skip(self))]
    pub fn expand(&mut self, iterations: u32) -> bool {
        let iterations = NumericValidator::clamp_to_range(iterations, 1, MAX_EXPAND_ITERATIONS);
        if self.mask.is_empty() {
            return false;
        }

        let before = self.mask.area();
        self.mask = Morphology::dilate(&self.mask, EXPAND_KERNEL, iterations as usize);
        let after = self.mask.area();
        debug!(before, after, "Mask expanded");
        after != before
    }

    /// Remove stroke pixels: `mask AND NOT stroke`
    ///
    /// # Errors
    /// - `GeometryMismatch` when the stroke differs from the mask
    #[instrument(level = "debug", skip_all, fields(stroke_area = stroke.area()))]
    pub fn trim(&mut self, stroke: &BoolMask) -> Result<bool> {
        let trimmed = self.mask.subtract(stroke)?;
        let changed = trimmed != self.mask;
        self.mask = trimmed;
        Ok(changed)
    }

    /// Add stroke pixels: `mask OR stroke`
    ///
    /// # Errors
    /// - `GeometryMismatch` when the stroke differs from the mask
    #[instrument(level = "debug", skip_all, fields(stroke_area = stroke.area()))]
    pub fn add(&mut self, stroke: &BoolMask) -> Result<bool> {
        let merged = self.mask.union(stroke)?;
        let changed = merged != self.mask;
        self.mask = merged;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaskEditError;

    fn block(x0: u32, y0: u32, side: u32) -> BoolMask {
        BoolMask::from_fn(32, 32, |x, y| {
            (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y)
        })
    }

    #[test]
    fn test_initial_state_is_empty() {
        let editor = MaskEditor::new(32, 32);
        assert_eq!(editor.state(), MaskState::Empty);
        assert_eq!(editor.dimensions(), (32, 32));
    }

    #[test]
    fn test_expand_on_empty_stays_empty() {
        let mut editor = MaskEditor::new(32, 32);
        assert!(!editor.expand(5));
        assert_eq!(editor.state(), MaskState::Empty);
    }

    #[test]
    fn test_expand_grows_by_iterations() {
        let mut editor = MaskEditor::from_mask(block(10, 10, 4));
        assert!(editor.expand(1));
        assert_eq!(editor.mask(), &block(9, 9, 6));

        let mut editor = MaskEditor::from_mask(block(10, 10, 4));
        editor.expand(3);
        assert_eq!(editor.mask(), &block(7, 7, 10));
    }

    #[test]
    fn test_expand_clamps_iterations() {
        let mut zero = MaskEditor::from_mask(block(10, 10, 4));
        zero.expand(0);
        assert_eq!(zero.mask(), &block(9, 9, 6));

        let mut huge = MaskEditor::from_mask(block(10, 10, 4));
        huge.expand(10_000);
        assert_eq!(huge.mask().area(), 32 * 32);
    }

    #[test]
    fn test_expand_saturated_reports_unchanged() {
        let mut editor = MaskEditor::from_mask(BoolMask::filled(8, 8));
        assert!(!editor.expand(2));
    }

    #[test]
    fn test_trim_shrinks_and_add_grows() -> Result<()> {
        let original = block(4, 4, 10);
        let stroke = block(10, 10, 10);

        let mut editor = MaskEditor::from_mask(original.clone());
        assert!(editor.trim(&stroke)?);
        assert!(original.contains(editor.mask()));
        assert!(!editor.mask().get(12, 12));

        let mut editor = MaskEditor::from_mask(original.clone());
        assert!(editor.add(&stroke)?);
        assert!(editor.mask().contains(&original));
        assert!(editor.mask().contains(&stroke));
        Ok(())
    }

    #[test]
    fn test_add_populates_empty_mask() -> Result<()> {
        let mut editor = MaskEditor::new(32, 32);
        assert!(!editor.add(&BoolMask::new(32, 32))?);
        assert_eq!(editor.state(), MaskState::Empty);
        assert!(editor.add(&block(0, 0, 2))?);
        assert_eq!(editor.state(), MaskState::Populated);
        Ok(())
    }

    #[test]
    fn test_mismatched_stroke_leaves_mask_untouched() {
        let mut editor = MaskEditor::from_mask(block(4, 4, 10));
        let before = editor.clone();

        let err = editor.trim(&BoolMask::filled(16, 16)).unwrap_err();
        assert!(matches!(err, MaskEditError::GeometryMismatch { .. }));
        assert!(editor.add(&BoolMask::filled(32, 16)).is_err());
        assert!(editor.replace(BoolMask::new(1, 1)).is_err());
        assert_eq!(editor, before);
    }

    #[test]
    fn test_replace_reports_change() -> Result<()> {
        let mut editor = MaskEditor::new(32, 32);
        assert!(editor.replace(block(1, 1, 3))?);
        assert!(!editor.replace(block(1, 1, 3))?);
        Ok(())
    }
}
