mod common;

use chrono::{Local, TimeZone};
use common::*;
use image::{Rgb, RgbImage};
use lopdf::Document;
use tag_sheets::*;

fn tile(id: u64, width: u32, height: u32) -> ComposedTile {
    let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    image.put_pixel(0, 0, Rgb([0, 0, 0]));
    image.put_pixel(width - 1, height - 1, Rgb([12, 34, 56]));
    ComposedTile {
        image,
        id: TagId::new(id).unwrap(),
        family: Family::default(),
        dpi: 300,
    }
}

#[tokio::test]
async fn test_export_one_page_per_tile() {
    let dir = tempfile::tempdir().unwrap();
    let tiles: Vec<ComposedTile> = (1..=9).map(|i| tile(i * 100, 60, 90)).collect();

    let path = export_document(&tiles, dir.path(), "JC").await.unwrap();
    assert!(path.starts_with(dir.path()));
    assert!(path.file_name().unwrap().to_string_lossy().ends_with("_JC.pdf"));
    assert_eq!(page_count(&path), 9);
}

#[tokio::test]
async fn test_export_page_size_and_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let original = tile(100, 300, 150);

    let path = export_document(std::slice::from_ref(&original), dir.path(), "one")
        .await
        .unwrap();
    let doc = Document::load(&path).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();

    // 300x150 px at 300 dpi is 72x36 pt
    let page = doc.get_dictionary(page_id).unwrap();
    let media_box: Vec<f32> = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_float().unwrap())
        .collect();
    assert_eq!(media_box, vec![0.0, 0.0, 72.0, 36.0]);

    let images = doc.get_page_images(page_id).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!((images[0].width, images[0].height), (300, 150));

    // Stored losslessly
    let stream = doc.get_object(images[0].id).unwrap().as_stream().unwrap();
    let pixels = stream.get_plain_content().unwrap();
    assert_eq!(pixels, original.image.as_raw().clone());
}

#[tokio::test]
async fn test_export_creates_destination() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("PDF").join("W10A");

    let path = export_document(&[tile(100, 10, 10)], &nested, "JC")
        .await
        .unwrap();
    assert!(nested.is_dir());
    assert_eq!(path.parent().unwrap(), nested.as_path());
}

#[tokio::test]
async fn test_export_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let created = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
    let tiles = [tile(100, 10, 10)];

    let first = export_document_at(&tiles, dir.path(), "JC", created)
        .await
        .unwrap();
    let second = export_document_at(&tiles, dir.path(), "JC", created)
        .await
        .unwrap();

    assert_ne!(first, second);
    assert!(first < second);
    assert!(first.ends_with("20240309_070502_000_JC.pdf"));
    assert!(second.ends_with("20240309_070502_001_JC.pdf"));
    assert_eq!(pdf_files(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_export_rejects_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let result = export_document(&[], dir.path(), "JC").await;
    assert!(matches!(result, Err(TagSheetError::EmptyDocument)));
    assert!(pdf_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_export_rejects_path_like_names() {
    let dir = tempfile::tempdir().unwrap();
    let result = export_document(&[tile(100, 10, 10)], dir.path(), "../escape").await;
    assert!(matches!(result, Err(TagSheetError::InvalidName(_))));
}
