//! Turn user clicks and strokes into a single selected mask

use crate::{
    catalog::MaskCatalog,
    types::{BoolMask, Point},
};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Flags for one selection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOptions {
    /// Points on unclaimed pixels select nothing when set; otherwise they
    /// select every unclaimed pixel
    pub ignore_background: bool,
    /// Complement the result as the last step
    pub invert: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            ignore_background: true,
            invert: false,
        }
    }
}

impl SelectionOptions {
    #[must_use]
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    #[must_use]
    pub fn with_ignore_background(mut self, ignore: bool) -> Self {
        self.ignore_background = ignore;
        self
    }
}

/// Resolves selections against a [`MaskCatalog`]
pub struct SelectionCompositor;

impl SelectionCompositor {
    /// Union of the full grids of every region hit by `points`
    ///
    /// The output always has the catalog's dimensions. Points outside the
    /// image contribute nothing, even with background selection enabled.
    #[must_use]
    #[instrument(skip(points, catalog), fields(points = points.len()))]
    pub fn select(points: &[Point], options: SelectionOptions, catalog: &MaskCatalog) -> BoolMask {
        let (width, height) = catalog.dimensions();
        let hits = catalog.lookup_by_points(points);

        // Catalog regions always share the catalog's dimensions
        let mut selected = Array2::from_elem((height as usize, width as usize), false);
        for region in hits.iter().filter_map(|&index| catalog.region(index)) {
            Self::accumulate(&mut selected, region.mask());
        }

        if !options.ignore_background {
            let on_background = points.iter().any(|point| {
                point.x < width && point.y < height && catalog.lookup_point(*point).is_none()
            });
            if on_background {
                Self::accumulate(&mut selected, &catalog.background_mask());
            }
        }
        let selected = BoolMask::from_array(selected);

        debug!(
            regions = hits.len(),
            area = selected.area(),
            invert = options.invert,
            "Selection resolved"
        );

        if options.invert {
            selected.inverted()
        } else {
            selected
        }
    }

    /// Select using every set pixel of a stroke as a point
    #[must_use]
    pub fn select_stroke(stroke: &BoolMask, options: SelectionOptions, catalog: &MaskCatalog) -> BoolMask {
        Self::select(&stroke.points(), options, catalog)
    }

    fn accumulate(selected: &mut Array2<bool>, mask: &BoolMask) {
        Zip::from(selected)
            .and(mask.as_array())
            .for_each(|out, &value| *out |= value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Region, RegionOrigin};

    fn rect(x0: u32, y0: u32, w: u32, h: u32) -> BoolMask {
        BoolMask::from_fn(20, 20, |x, y| {
            (x0..x0 + w).contains(&x) && (y0..y0 + h).contains(&y)
        })
    }

    fn catalog() -> MaskCatalog {
        let regions = vec![
            Region::new(rect(0, 0, 10, 10), RegionOrigin::Segment { emission_index: 0 }, None),
            Region::new(rect(12, 12, 4, 4), RegionOrigin::Segment { emission_index: 1 }, None),
        ];
        MaskCatalog::from_regions(regions, (20, 20))
    }

    #[test]
    fn test_single_click_selects_region() {
        let mask = SelectionCompositor::select(&[Point::new(3, 3)], SelectionOptions::default(), &catalog());
        assert_eq!(mask, rect(0, 0, 10, 10));
    }

    #[test]
    fn test_multiple_clicks_union() {
        let points = [Point::new(3, 3), Point::new(13, 13), Point::new(4, 4)];
        let mask = SelectionCompositor::select(&points, SelectionOptions::default(), &catalog());
        assert_eq!(mask.area(), 100 + 16);
    }

    #[test]
    fn test_background_click_ignored_by_default() {
        let mask = SelectionCompositor::select(&[Point::new(18, 2)], SelectionOptions::default(), &catalog());
        assert!(mask.is_empty());
        assert_eq!(mask.dimensions(), (20, 20));
    }

    #[test]
    fn test_background_click_selects_unclaimed_pixels() {
        let options = SelectionOptions::default().with_ignore_background(false);
        let mask = SelectionCompositor::select(&[Point::new(18, 2)], options, &catalog());
        assert_eq!(mask.area(), 400 - 100 - 16);
        assert!(!mask.get(0, 0));

        // out-of-bounds points never count as background
        let mask = SelectionCompositor::select(&[Point::new(40, 2)], options, &catalog());
        assert!(mask.is_empty());
    }

    #[test]
    fn test_invert_applies_last() {
        let options = SelectionOptions::default().with_invert(true);
        let mask = SelectionCompositor::select(&[Point::new(3, 3)], options, &catalog());
        assert_eq!(mask, rect(0, 0, 10, 10).inverted());

        let nothing = SelectionCompositor::select(&[], options, &catalog());
        assert_eq!(nothing.area(), 400);
    }

    #[test]
    fn test_overlapping_regions_union_full_grids() {
        let regions = vec![
            Region::new(rect(0, 0, 10, 10), RegionOrigin::Segment { emission_index: 0 }, None),
            Region::new(rect(5, 5, 10, 10), RegionOrigin::Segment { emission_index: 1 }, None),
        ];
        let overlapping = MaskCatalog::from_regions(regions, (20, 20));

        // (12, 12) is owned by the second region, which still contributes
        // the pixels the first one claims
        let mask = SelectionCompositor::select(&[Point::new(12, 12)], SelectionOptions::default(), &overlapping);
        assert_eq!(mask, rect(5, 5, 10, 10));

        let both = [Point::new(1, 1), Point::new(12, 12)];
        let mask = SelectionCompositor::select(&both, SelectionOptions::default(), &overlapping);
        assert_eq!(mask.area(), 100 + 100 - 25);
    }

    #[test]
    fn test_stroke_selection() {
        let stroke = rect(8, 8, 6, 6);
        let mask = SelectionCompositor::select_stroke(&stroke, SelectionOptions::default(), &catalog());
        assert_eq!(mask.area(), 116);
    }
}
