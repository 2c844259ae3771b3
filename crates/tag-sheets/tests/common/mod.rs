#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tag_sheets::*;
use tempfile::TempDir;

pub const FAMILY: &str = "tagStandard41h12";

/// Places a system font may live on CI machines and workstations
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A usable TrueType font, from `TAG_SHEETS_TEST_FONT` or a well-known location
pub fn find_font() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TAG_SHEETS_TEST_FONT") {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }
    let found = FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file());
    if found.is_none() {
        eprintln!("No TrueType font found, set TAG_SHEETS_TEST_FONT to run this test");
    }
    found
}

/// 6x6 marker-like pattern: black frame, one white cell whose position depends on `seed`
pub fn marker_image(seed: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255]));
    for y in 1..5 {
        for x in 1..5 {
            if (x + y * 4 + seed) % 3 == 0 {
                image.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }
    image
}

pub fn file_name(id: u32) -> String {
    format!("tag41_12_{:05}.png", id)
}

/// Write a marker image for `id` into `<root>/<family>/`
pub fn write_tag(root: &Path, family: &str, id: u32) -> PathBuf {
    let dir = root.join(family);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file_name(id));
    marker_image(id).save(&path).unwrap();
    path
}

/// Corpus holding one image per identifier
pub fn corpus_with(ids: &[u32]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for &id in ids {
        write_tag(dir.path(), FAMILY, id);
    }
    dir
}

/// Small, fast settings: 10mm tags at 100 dpi
pub fn small_options(corpus: &Path, output: &Path, font: &Path) -> SheetOptions {
    SheetOptions {
        corpus_root: corpus.to_path_buf(),
        output_root: output.to_path_buf(),
        font_path: font.to_path_buf(),
        family: Family::new(FAMILY).unwrap(),
        dpi: 100,
        target_tile_size_mm: PhysicalSize {
            width_mm: 10.0,
            height_mm: 10.0,
        },
        ..Default::default()
    }
}

pub fn pdf_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "pdf"))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

pub fn page_count(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

/// Raw RGB samples of the image drawn on each page, in page order
pub fn page_pixels(path: &Path) -> Vec<Vec<u8>> {
    let doc = lopdf::Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let images = doc.get_page_images(page_id).unwrap();
            assert_eq!(images.len(), 1);
            let stream = doc.get_object(images[0].id).unwrap().as_stream().unwrap();
            stream.get_plain_content().unwrap()
        })
        .collect()
}

/// Path of the document exported for `collection/group`
pub fn exported_path(report: &RunReport, collection: &str, group: &str) -> PathBuf {
    match &report.find(collection, group).unwrap().status {
        GroupStatus::Exported { path, .. } => path.clone(),
        other => panic!("{collection}/{group} was not exported: {other:?}"),
    }
}
