//! Ordered collection of postprocessed regions for the active image
//!
//! Regions are held in lookup order: the padding region (if any) first, then
//! segments by descending area with ties kept in backend emission order.
//! Point lookup returns the first region in that order containing the point,
//! so at overlaps the larger region wins unless padding claims the pixel.

use crate::{
    error::{MaskEditError, Result},
    postprocess::RawMaskPostprocessor,
    types::{BoolMask, Point, RawMask, Region},
    utils::RegionPalette,
};
use image::RgbImage;
use ndarray::{Array2, Zip};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

const NO_OWNER: u32 = u32::MAX;

/// Ordered region masks for one image
#[derive(Debug, Clone)]
pub struct MaskCatalog {
    width: u32,
    height: u32,
    regions: Vec<Region>,
    /// Index of the first region (in catalog order) claiming each pixel
    owners: Array2<u32>,
}

impl MaskCatalog {
    /// Postprocess every raw mask to `(width, height)` and order by
    /// descending area
    #[must_use]
    #[instrument(skip(raw_masks, postprocessor), fields(raw_count = raw_masks.len()))]
    pub fn build(
        raw_masks: &[RawMask],
        dimensions: (u32, u32),
        postprocessor: &RawMaskPostprocessor,
    ) -> Self {
        let (width, height) = dimensions;
        let regions = raw_masks
            .iter()
            .enumerate()
            .map(|(index, raw)| postprocessor.postprocess_region(raw, index, height, width))
            .collect();
        Self::from_regions(regions, dimensions)
    }

    /// Order already postprocessed regions; any padding regions in the input
    /// are dropped, use [`Self::insert_padding`] instead
    #[must_use]
    pub fn from_regions(mut regions: Vec<Region>, dimensions: (u32, u32)) -> Self {
        regions.retain(|region| !region.is_padding() && region.mask().dimensions() == dimensions);
        // sort_by is stable: equal areas keep emission order
        regions.sort_by(|a, b| b.area().cmp(&a.area()));

        let mut catalog = Self {
            width: dimensions.0,
            height: dimensions.1,
            regions,
            owners: Array2::from_elem((dimensions.1 as usize, dimensions.0 as usize), NO_OWNER),
        };
        catalog.rebuild_owners();
        debug!(
            regions = catalog.regions.len(),
            largest = catalog.regions.first().map_or(0, Region::area),
            "Mask catalog built"
        );
        catalog
    }

    /// Put `padding` at position 0, replacing any previous padding region;
    /// `None` removes it
    ///
    /// # Errors
    /// - `GeometryMismatch` when the padding mask differs from the catalog
    pub fn insert_padding(mut self, padding: Option<&BoolMask>) -> Result<Self> {
        if let Some(mask) = padding {
            if mask.dimensions() != self.dimensions() {
                return Err(MaskEditError::geometry_mismatch(
                    "padding region",
                    self.dimensions(),
                    mask.dimensions(),
                ));
            }
        }

        self.regions.retain(|region| !region.is_padding());
        if let Some(mask) = padding {
            self.regions.insert(0, Region::padding(mask.clone()));
        }
        self.rebuild_owners();
        Ok(self)
    }

    /// Resolve each point to the first region containing it; points outside
    /// every region (or outside the image) contribute nothing
    #[must_use]
    pub fn lookup_by_points<'a, I>(&self, points: I) -> BTreeSet<usize>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        points
            .into_iter()
            .filter_map(|point| self.lookup_point(*point))
            .collect()
    }

    /// First region in catalog order containing `point`
    #[must_use]
    pub fn lookup_point(&self, point: Point) -> Option<usize> {
        self.owners
            .get((point.y as usize, point.x as usize))
            .copied()
            .filter(|&owner| owner != NO_OWNER)
            .map(|owner| owner as usize)
    }

    /// Pixels not claimed by any region
    #[must_use]
    pub fn background_mask(&self) -> BoolMask {
        BoolMask::from_array(self.owners.mapv(|owner| owner == NO_OWNER))
    }

    /// Paint each region in its palette colour and blend over `image`
    ///
    /// A pixel takes the colour of the first region claiming it; unclaimed
    /// pixels keep the image colour.
    ///
    /// # Errors
    /// - `GeometryMismatch` when `image` differs from the catalog
    pub fn render_color_overlay(&self, image: &RgbImage, alpha: f32) -> Result<RgbImage> {
        if image.dimensions() != self.dimensions() {
            return Err(MaskEditError::geometry_mismatch(
                "color overlay",
                self.dimensions(),
                image.dimensions(),
            ));
        }

        let mut output = image.clone();
        for (x, y, pixel) in output.enumerate_pixels_mut() {
            if let Some(index) = self.lookup_point(Point::new(x, y)) {
                *pixel = RegionPalette::blend(*pixel, RegionPalette::color(index), alpha);
            }
        }
        Ok(output)
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[must_use]
    pub fn has_padding(&self) -> bool {
        self.regions.first().is_some_and(Region::is_padding)
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rebuild_owners(&mut self) {
        self.owners.fill(NO_OWNER);
        for (index, region) in self.regions.iter().enumerate() {
            let index = index as u32;
            Zip::from(&mut self.owners)
                .and(region.mask().as_array())
                .for_each(|owner, &set| {
                    if set && *owner == NO_OWNER {
                        *owner = index;
                    }
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionOrigin;

    fn rect(width: u32, height: u32, x0: u32, y0: u32, w: u32, h: u32) -> BoolMask {
        BoolMask::from_fn(width, height, |x, y| {
            (x0..x0 + w).contains(&x) && (y0..y0 + h).contains(&y)
        })
    }

    fn segment(mask: BoolMask, emission_index: usize) -> Region {
        Region::new(mask, RegionOrigin::Segment { emission_index }, None)
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        // a1 = 100 > a2 = a3 = 50, emitted as a2, a1, a3
        let regions = vec![
            segment(rect(40, 40, 0, 0, 10, 5), 0),
            segment(rect(40, 40, 20, 20, 10, 10), 1),
            segment(rect(40, 40, 0, 30, 5, 10), 2),
        ];
        let catalog = MaskCatalog::from_regions(regions, (40, 40));

        let order: Vec<_> = catalog.regions().iter().map(Region::origin).collect();
        assert_eq!(
            order,
            vec![
                RegionOrigin::Segment { emission_index: 1 },
                RegionOrigin::Segment { emission_index: 0 },
                RegionOrigin::Segment { emission_index: 2 },
            ]
        );
    }

    #[test]
    fn test_overlap_resolves_to_larger_region() {
        // A has area 500, B has area 100 and sits inside A
        let a = segment(rect(50, 50, 0, 0, 25, 20), 1);
        let b = segment(rect(50, 50, 5, 5, 10, 10), 0);
        let catalog = MaskCatalog::from_regions(vec![b, a], (50, 50));
        assert_eq!(catalog.region(0).map(Region::area), Some(500));

        let hits = catalog.lookup_by_points(&[Point::new(7, 7)]);
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_padding_wins_regardless_of_area() -> Result<()> {
        let big = segment(BoolMask::filled(20, 20), 0);
        let catalog = MaskCatalog::from_regions(vec![big], (20, 20));
        let padding = rect(20, 20, 0, 0, 2, 20);
        let catalog = catalog.insert_padding(Some(&padding))?;

        assert!(catalog.has_padding());
        assert_eq!(catalog.lookup_point(Point::new(1, 10)), Some(0));
        assert_eq!(catalog.lookup_point(Point::new(10, 10)), Some(1));
        Ok(())
    }

    #[test]
    fn test_padding_is_replaced_not_duplicated() -> Result<()> {
        let catalog = MaskCatalog::from_regions(vec![segment(rect(10, 10, 4, 4, 2, 2), 0)], (10, 10));
        let catalog = catalog
            .insert_padding(Some(&rect(10, 10, 0, 0, 1, 10)))?
            .insert_padding(Some(&rect(10, 10, 9, 0, 1, 10)))?;
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.regions().iter().filter(|r| r.is_padding()).count(), 1);
        assert_eq!(catalog.lookup_point(Point::new(0, 0)), None);
        assert_eq!(catalog.lookup_point(Point::new(9, 0)), Some(0));

        let catalog = catalog.insert_padding(None)?;
        assert!(!catalog.has_padding());
        assert_eq!(catalog.len(), 1);
        Ok(())
    }

    #[test]
    fn test_padding_geometry_checked() {
        let catalog = MaskCatalog::from_regions(Vec::new(), (10, 10));
        let err = catalog.insert_padding(Some(&BoolMask::new(12, 10))).unwrap_err();
        assert!(matches!(err, MaskEditError::GeometryMismatch { .. }));
    }

    #[test]
    fn test_lookup_ignores_background_and_out_of_bounds() {
        let catalog = MaskCatalog::from_regions(vec![segment(rect(10, 10, 0, 0, 3, 3), 0)], (10, 10));
        let hits = catalog.lookup_by_points(&[Point::new(8, 8), Point::new(50, 50), Point::new(1, 1)]);
        assert_eq!(hits.len(), 1);
        assert!(hits.contains(&0));
    }

    #[test]
    fn test_background_mask() {
        let catalog = MaskCatalog::from_regions(vec![segment(rect(4, 4, 0, 0, 2, 4), 0)], (4, 4));
        let background = catalog.background_mask();
        assert_eq!(background.area(), 8);
        assert!(background.get(3, 0));
        assert!(!background.get(0, 0));
    }

    #[test]
    fn test_build_postprocesses_raw_masks() {
        let raw = vec![
            RawMask::new(rect(32, 32, 0, 0, 8, 8)),
            RawMask::new(rect(32, 32, 8, 8, 16, 16)),
        ];
        let catalog = MaskCatalog::build(&raw, (64, 64), &RawMaskPostprocessor::default());
        assert_eq!(catalog.dimensions(), (64, 64));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.region(0).map(Region::area), Some(32 * 32));
        assert_eq!(
            catalog.region(1).map(Region::origin),
            Some(RegionOrigin::Segment { emission_index: 0 })
        );
    }

    #[test]
    fn test_color_overlay_is_deterministic() -> Result<()> {
        let regions = vec![
            segment(rect(8, 8, 0, 0, 4, 8), 0),
            segment(rect(8, 8, 4, 0, 2, 8), 1),
        ];
        let catalog = MaskCatalog::from_regions(regions, (8, 8));
        let image = RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]));

        let first = catalog.render_color_overlay(&image, 1.0)?;
        let second = catalog.render_color_overlay(&image, 1.0)?;
        assert_eq!(first, second);
        assert_eq!(*first.get_pixel(0, 0), RegionPalette::color(0));
        assert_eq!(*first.get_pixel(5, 0), RegionPalette::color(1));
        assert_eq!(*first.get_pixel(7, 0), image::Rgb([0, 0, 0]));

        assert!(catalog.render_color_overlay(&RgbImage::new(4, 4), 0.5).is_err());
        Ok(())
    }
}
