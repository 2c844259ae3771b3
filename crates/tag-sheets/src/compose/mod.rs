//! Tile composition - turning a located tag into a printable raster
//!
//! 1. Decode the source and scale it to the physical size with nearest
//!    neighbour sampling (smoothing would blur the marker cells)
//! 2. Flatten transparency onto white and place the tag on its canvas
//! 3. Write the legend below the tag
//! 4. Add the border

mod geometry;
mod legend;

pub use geometry::{PixelRect, TileGeometry, center_offset, physical_to_pixels};
pub use legend::{Legend, LegendFont};

use crate::types::*;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

/// Size, resolution and placement shared by every tile of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSettings {
    pub width_mm: f64,
    pub height_mm: f64,
    pub dpi: u32,
    pub layout: Layout,
}

impl TileSettings {
    /// Pixel size of the resized tag
    pub fn tag_pixels(&self) -> (u32, u32) {
        physical_to_pixels(self.width_mm, self.height_mm, self.dpi)
    }
}

/// Decode a corpus image. Unreadable, empty or corrupt files are reported
/// per path so the caller can decide whether to skip the tile.
pub fn load_tag_image(path: &Path) -> Result<RgbaImage> {
    let decode_error = |source: image::ImageError| TagSheetError::ImageDecode {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(|e| decode_error(image::ImageError::IoError(e)))?;
    let image = image::load_from_memory(&bytes).map_err(decode_error)?;
    Ok(image.to_rgba8())
}

/// Nearest-neighbour resize, the only filter that keeps marker cells sharp
pub fn resize_tag(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(source, width, height, FilterType::Nearest)
}

/// Blend an RGBA image onto a white background
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Compose one located tag into a finished tile or page.
///
/// The legend shows the identifier, the family and `annotation`.
pub fn compose_tile(
    tag: &LocatedTag,
    settings: &TileSettings,
    annotation: &str,
    font: &LegendFont,
) -> Result<ComposedTile> {
    let (tag_width, tag_height) = settings.tag_pixels();
    let legend = Legend::new(tag.id, &tag.family, annotation);
    let geometry = TileGeometry::compute(
        settings.layout,
        (tag_width, tag_height),
        settings.dpi,
        legend.len(),
    )?;

    let source = load_tag_image(&tag.path)?;
    let resized = flatten_on_white(&resize_tag(&source, tag_width, tag_height));

    let mut canvas = RgbImage::from_pixel(geometry.width, geometry.height, Rgb([255, 255, 255]));
    imageops::replace(
        &mut canvas,
        &resized,
        i64::from(geometry.tag.x),
        i64::from(geometry.tag.y),
    );

    legend::draw_legend(
        &mut canvas,
        font,
        &legend,
        &geometry.legend,
        geometry.legend_font_px,
    );
    draw_border(&mut canvas, geometry.border);

    log::debug!(
        "Composed {} ({}) as {}x{}px at {} dpi",
        tag.id,
        tag.family,
        canvas.width(),
        canvas.height(),
        settings.dpi
    );

    Ok(ComposedTile {
        image: canvas,
        id: tag.id,
        family: tag.family.clone(),
        dpi: settings.dpi,
    })
}

/// Paint a solid black frame of `width` pixels along the image edges
fn draw_border(canvas: &mut RgbImage, width: u32) {
    let (w, h) = canvas.dimensions();
    if width == 0 || w <= 2 * width || h <= 2 * width {
        return;
    }
    let black = Rgb([0, 0, 0]);
    let edges = [
        Rect::at(0, 0).of_size(w, width),
        Rect::at(0, (h - width) as i32).of_size(w, width),
        Rect::at(0, 0).of_size(width, h),
        Rect::at((w - width) as i32, 0).of_size(width, h),
    ];
    for edge in edges {
        draw_filled_rect_mut(canvas, edge, black);
    }
}
