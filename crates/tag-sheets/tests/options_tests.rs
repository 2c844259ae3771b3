use tag_sheets::*;

#[test]
fn test_tile_settings_follow_options() {
    let options = SheetOptions {
        dpi: 600,
        target_tile_size_mm: PhysicalSize {
            width_mm: 50.0,
            height_mm: 25.4,
        },
        layout: Layout::Page {
            paper: PaperSize::A4,
        },
        ..Default::default()
    };
    let settings = options.tile_settings();
    assert_eq!(settings.tag_pixels(), (1181, 600));
    assert_eq!(settings.layout, options.layout);
}

#[test]
fn test_unknown_family_is_accepted() {
    let options = SheetOptions {
        family: Family::new("myCustomFamily").unwrap(),
        ..Default::default()
    };
    assert!(!options.family.is_known());
    assert!(options.validate().is_ok());
}

#[test]
fn test_oversized_tag_for_paper_is_a_configuration_error() {
    let options = SheetOptions {
        target_tile_size_mm: PhysicalSize {
            width_mm: 200.0,
            height_mm: 200.0,
        },
        layout: Layout::Page {
            paper: PaperSize::A5,
        },
        ..Default::default()
    };
    assert!(matches!(
        options.validate(),
        Err(TagSheetError::TagDoesNotFit { .. })
    ));
}

#[test]
fn test_collection_groups() {
    let collection = Collection::new("W11A", ["MA", "MB", "MC"], 24);
    let groups = collection.groups().unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[2].offset, 26);
    assert_eq!(groups[2].ids[0].value(), 126);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = SheetOptions::load(dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(TagSheetError::Io(_))));
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();
    assert!(matches!(
        SheetOptions::load(&path).await,
        Err(TagSheetError::Config(_))
    ));
}
