//! Pixel geometry of composed tiles
//!
//! Everything here is pure arithmetic so the placement rules can be checked
//! without decoding images or loading fonts.

use crate::constants::*;
use crate::types::*;

/// Convert a physical size to pixels at the given resolution.
///
/// `pixels = round(mm * dpi / 25.4)` per axis, halves rounded away from zero.
/// Negative or non-finite sizes collapse to zero.
pub fn physical_to_pixels(width_mm: f64, height_mm: f64, dpi: u32) -> (u32, u32) {
    (mm_to_px(width_mm, dpi), mm_to_px(height_mm, dpi))
}

fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    let px = (mm * f64::from(dpi) / MM_PER_INCH).round();
    if px.is_finite() && px > 0.0 {
        px.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Offset that centers `inner` inside `outer`
pub fn center_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// A rectangle in raster coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Where everything goes on one output raster
#[derive(Debug, Clone, PartialEq)]
pub struct TileGeometry {
    /// Final raster size, border included
    pub width: u32,
    pub height: u32,
    /// Resized marker position
    pub tag: PixelRect,
    /// Area reserved for legend text
    pub legend: PixelRect,
    /// Legend font size before width fitting
    pub legend_font_px: f32,
    /// Border thickness; drawn outside the content for tiles, inside the page edge for pages
    pub border: u32,
}

impl TileGeometry {
    /// Geometry for a tag of `tag_px` pixels carrying `legend_lines` lines of text
    pub fn compute(
        layout: Layout,
        tag_px: (u32, u32),
        dpi: u32,
        legend_lines: usize,
    ) -> Result<Self> {
        let (tag_width, tag_height) = tag_px;
        if tag_width == 0 || tag_height == 0 {
            return Err(TagSheetError::InvalidDimensions(format!(
                "tag resolves to {tag_width}x{tag_height}px at {dpi} dpi"
            )));
        }
        if tag_width > MAX_RASTER_PX || tag_height > MAX_RASTER_PX {
            return Err(TagSheetError::InvalidDimensions(format!(
                "tag resolves to {tag_width}x{tag_height}px at {dpi} dpi, larger than {MAX_RASTER_PX}px"
            )));
        }

        match layout {
            Layout::Tile => Ok(Self::tile(tag_px, legend_lines)),
            Layout::Page { paper } => Self::page(paper, tag_px, dpi, legend_lines),
        }
    }

    fn tile((tag_width, tag_height): (u32, u32), legend_lines: usize) -> Self {
        let border = TILE_BORDER_PX;
        let canvas_width = tag_width + 2 * TILE_MARGIN_PX;
        let canvas_height = tag_height + 2 * TILE_MARGIN_PX;
        let band_height = (canvas_height / LEGEND_BAND_RATIO).max(1);

        // Canvas sits inset inside the legend background, band underneath it
        let canvas_x = border + LEGEND_INSET_PX;
        let canvas_y = border + LEGEND_INSET_PX;
        let tag = PixelRect::new(
            canvas_x + center_offset(canvas_width, tag_width),
            canvas_y + center_offset(canvas_height, tag_height),
            tag_width,
            tag_height,
        );

        let legend = PixelRect::new(
            canvas_x + TILE_MARGIN_PX,
            canvas_y + canvas_height,
            tag_width,
            band_height.saturating_sub(LEGEND_INSET_PX).max(1),
        );

        let width = canvas_width + 2 * LEGEND_INSET_PX + 2 * border;
        let height = LEGEND_INSET_PX + canvas_height + band_height + 2 * border;

        Self {
            width,
            height,
            tag,
            legend,
            legend_font_px: line_fit(legend.height, legend_lines),
            border,
        }
    }

    fn page(
        paper: PaperSize,
        (tag_width, tag_height): (u32, u32),
        dpi: u32,
        legend_lines: usize,
    ) -> Result<Self> {
        let (paper_width_mm, paper_height_mm) = paper.dimensions_mm();
        let (page_width, page_height) = physical_to_pixels(paper_width_mm, paper_height_mm, dpi);
        if page_width > MAX_RASTER_PX || page_height > MAX_RASTER_PX {
            return Err(TagSheetError::InvalidDimensions(format!(
                "page resolves to {page_width}x{page_height}px at {dpi} dpi, larger than {MAX_RASTER_PX}px"
            )));
        }
        let border = TILE_BORDER_PX;

        let font_px = (page_height / PAGE_LEGEND_FONT_RATIO) as f32;
        let gap = page_height / PAGE_LEGEND_GAP_RATIO;
        let legend_height = (legend_lines.max(1) as f32 * font_px * LEGEND_LINE_SPACING).ceil() as u32;

        let tag = PixelRect::new(
            center_offset(page_width, tag_width),
            center_offset(page_height, tag_height),
            tag_width,
            tag_height,
        );
        let legend_x = page_width / 4;
        let legend = PixelRect::new(
            legend_x,
            tag.bottom() + gap,
            page_width.saturating_sub(legend_x + border + LEGEND_INSET_PX),
            legend_height,
        );

        let fits_horizontally = tag_width + 2 * border <= page_width;
        let fits_vertically = legend.bottom() + border <= page_height && tag.y >= border;
        if !fits_horizontally || !fits_vertically || legend.width == 0 {
            return Err(TagSheetError::TagDoesNotFit {
                tag_width,
                tag_height,
                page_width,
                page_height,
            });
        }

        Ok(Self {
            width: page_width,
            height: page_height,
            tag,
            legend,
            legend_font_px: font_px,
            border,
        })
    }
}

/// Largest font size that stacks `lines` lines inside `height` pixels
fn line_fit(height: u32, lines: usize) -> f32 {
    let lines = lines.max(1) as f32;
    (height as f32 / (lines * LEGEND_LINE_SPACING))
        .floor()
        .max(MIN_LEGEND_FONT_PX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_to_pixels_reference_value() {
        assert_eq!(physical_to_pixels(100.0, 100.0, 300), (1181, 1181));
    }

    #[test]
    fn test_physical_to_pixels_a4() {
        assert_eq!(physical_to_pixels(210.0, 297.0, 300), (2480, 3508));
    }

    #[test]
    fn test_physical_to_pixels_rounds_half_away_from_zero() {
        // 12.7mm at 1 dpi is exactly half a pixel
        assert_eq!(physical_to_pixels(12.7, 12.7, 1), (1, 1));
        assert_eq!(physical_to_pixels(25.4, 25.4, 72), (72, 72));
    }

    #[test]
    fn test_physical_to_pixels_degenerate_inputs() {
        assert_eq!(physical_to_pixels(-10.0, f64::NAN, 300), (0, 0));
        assert_eq!(physical_to_pixels(0.0, 0.0, 300), (0, 0));
    }

    #[test]
    fn test_tile_geometry_centers_tag_and_keeps_legend_clear() {
        let geometry = TileGeometry::compute(Layout::Tile, (1181, 1181), 300, 3).unwrap();

        // canvas = 1181 + 2*50, legend band = canvas / 10
        let canvas = 1181 + 100;
        let band = canvas / 10;
        assert_eq!(geometry.width, canvas + 2 * 5 + 2 * 10);
        assert_eq!(geometry.height, 5 + canvas + band + 2 * 10);

        assert_eq!(geometry.tag.x, 10 + 5 + 50);
        assert_eq!(geometry.tag.y, 10 + 5 + 50);
        assert!(!geometry.tag.intersects(&geometry.legend));
        assert!(geometry.legend.y >= geometry.tag.bottom());
        assert!(geometry.legend.bottom() <= geometry.height - geometry.border);

        let text_height = geometry.legend_font_px * 3.0 * LEGEND_LINE_SPACING;
        assert!(text_height <= geometry.legend.height as f32);
    }

    #[test]
    fn test_tile_legend_scales_with_tile() {
        let small = TileGeometry::compute(Layout::Tile, (300, 300), 300, 3).unwrap();
        let large = TileGeometry::compute(Layout::Tile, (1200, 1200), 300, 3).unwrap();
        assert!(large.legend.height > small.legend.height);
        assert!(large.legend_font_px > small.legend_font_px);
    }

    #[test]
    fn test_page_geometry_matches_paper() {
        let layout = Layout::Page {
            paper: PaperSize::A4,
        };
        let geometry = TileGeometry::compute(layout, (1181, 1181), 300, 3).unwrap();
        assert_eq!((geometry.width, geometry.height), (2480, 3508));
        assert_eq!(geometry.tag.x, (2480 - 1181) / 2);
        assert_eq!(geometry.tag.y, (3508 - 1181) / 2);
        assert_eq!(geometry.legend.x, 2480 / 4);
        assert!(!geometry.tag.intersects(&geometry.legend));
    }

    #[test]
    fn test_page_geometry_rejects_oversized_tag() {
        let layout = Layout::Page {
            paper: PaperSize::A5,
        };
        let result = TileGeometry::compute(layout, (3000, 3000), 300, 3);
        assert!(matches!(result, Err(TagSheetError::TagDoesNotFit { .. })));
    }

    #[test]
    fn test_huge_tag_is_rejected_without_overflow() {
        let (w, h) = physical_to_pixels(1e12, 1e12, 300);
        assert_eq!((w, h), (u32::MAX, u32::MAX));
        for layout in [
            Layout::Tile,
            Layout::Page {
                paper: PaperSize::A4,
            },
        ] {
            let result = TileGeometry::compute(layout, (w, h), 300, 3);
            assert!(matches!(result, Err(TagSheetError::InvalidDimensions(_))));
        }
    }

    #[test]
    fn test_huge_paper_is_rejected_without_overflow() {
        let layout = Layout::Page {
            paper: PaperSize::Custom {
                width_mm: 1e12,
                height_mm: 1e12,
            },
        };
        let result = TileGeometry::compute(layout, (1181, 1181), 300, 3);
        assert!(matches!(result, Err(TagSheetError::InvalidDimensions(_))));
    }

    #[test]
    fn test_zero_sized_tag_is_rejected() {
        let result = TileGeometry::compute(Layout::Tile, (0, 10), 300, 3);
        assert!(matches!(result, Err(TagSheetError::InvalidDimensions(_))));
    }
}
