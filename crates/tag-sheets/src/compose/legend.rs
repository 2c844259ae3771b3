//! Legend text: font loading and rendering

use super::geometry::PixelRect;
use crate::constants::{LEGEND_LINE_SPACING, MIN_LEGEND_FONT_PX};
use crate::types::*;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::{Path, PathBuf};

/// TrueType/OpenType font used for every legend of a run
#[derive(Clone)]
pub struct LegendFont {
    font: FontArc,
    path: PathBuf,
}

impl std::fmt::Debug for LegendFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegendFont")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LegendFont {
    /// Load a font file. A missing file is reported as `FontNotFound`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TagSheetError::FontNotFound { path });
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_bytes(bytes, path)
    }

    pub fn from_bytes(bytes: Vec<u8>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| TagSheetError::InvalidFont { path: path.clone() })?;
        Ok(Self { font, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn font(&self) -> &FontArc {
        &self.font
    }
}

/// Lines printed under a tag
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub lines: Vec<String>,
}

impl Legend {
    /// `ID`, `Family`, then each non-empty line of the caller's annotation
    pub fn new(id: TagId, family: &Family, annotation: &str) -> Self {
        let mut lines = vec![format!("ID: {id}"), format!("Family: {family}")];
        lines.extend(
            annotation
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Shrink `max_px` until the widest line fits in `max_width`
pub(crate) fn fit_font_px(font: &LegendFont, lines: &[String], max_px: f32, max_width: u32) -> f32 {
    let mut px = max_px.max(MIN_LEGEND_FONT_PX);
    while px > MIN_LEGEND_FONT_PX {
        let widest = lines
            .iter()
            .map(|line| text_size(PxScale::from(px), font.font(), line).0)
            .max()
            .unwrap_or(0);
        if widest <= max_width {
            break;
        }
        // Text width is close to linear in the scale
        let ratio = max_width as f32 / widest as f32;
        px = (px * ratio).floor().min(px - 1.0).max(MIN_LEGEND_FONT_PX);
    }
    px
}

/// Draw the legend into `area`, one line per row, top-aligned
pub(crate) fn draw_legend(
    canvas: &mut RgbImage,
    font: &LegendFont,
    legend: &Legend,
    area: &PixelRect,
    max_px: f32,
) {
    let px = fit_font_px(font, &legend.lines, max_px, area.width);
    let scale = PxScale::from(px);
    let line_height = px * LEGEND_LINE_SPACING;

    for (row, line) in legend.lines.iter().enumerate() {
        let y = area.y as f32 + row as f32 * line_height;
        draw_text_mut(
            canvas,
            Rgb([0, 0, 0]),
            area.x as i32,
            y.round() as i32,
            scale,
            font.font(),
            line,
        );
    }
}
