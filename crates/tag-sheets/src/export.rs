//! Multi-page PDF export
//!
//! Each composed tile becomes one page whose media box is the tile's physical
//! size. Pixels are stored as an 8-bit DeviceRGB image XObject with Flate
//! compression only, so the printed raster is bit-identical to the composed one.

use crate::constants::POINTS_PER_INCH;
use crate::types::*;
use chrono::{DateTime, Duration, Local};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Sortable timestamp prefix of artifact names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Artifact file extension
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Attempts at finding a free file name before giving up
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Write `tiles` as one PDF in `destination_dir`, named `{timestamp}_{name}.pdf`.
///
/// The directory is created when missing. An existing file is never
/// overwritten: on a name clash the timestamp moves forward by a millisecond.
pub async fn export_document(
    tiles: &[ComposedTile],
    destination_dir: impl AsRef<Path>,
    name: &str,
) -> Result<PathBuf> {
    export_document_at(tiles, destination_dir, name, Local::now()).await
}

/// `export_document` with an explicit creation time
pub async fn export_document_at(
    tiles: &[ComposedTile],
    destination_dir: impl AsRef<Path>,
    name: &str,
    created: DateTime<Local>,
) -> Result<PathBuf> {
    if tiles.is_empty() {
        return Err(TagSheetError::EmptyDocument);
    }
    validate_name(name)?;

    let destination_dir = destination_dir.as_ref().to_owned();
    tokio::fs::create_dir_all(&destination_dir).await?;

    let tiles = tiles.to_vec();
    let title = name.to_string();
    let bytes = tokio::task::spawn_blocking(move || {
        let mut doc = build_document(&tiles, &title)?;
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, TagSheetError>(writer)
    })
    .await??;

    let (path, file) = create_unique(&destination_dir, name, created).await?;
    write_or_discard(&path, file, &bytes).await?;

    log::info!("PDF saved: {}", path.display());
    Ok(path)
}

/// Write `bytes` to the freshly created `path`, removing it again on failure
async fn write_or_discard<W>(path: &Path, mut out: W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match out.write_all(bytes).await {
        Ok(()) => out.flush().await,
        Err(e) => Err(e),
    };
    drop(out);

    if let Err(e) = written {
        if let Err(remove_error) = tokio::fs::remove_file(path).await {
            log::warn!(
                "Could not remove incomplete {}: {}",
                path.display(),
                remove_error
            );
        }
        return Err(e.into());
    }
    Ok(())
}

/// Artifact path for a given creation time
pub fn artifact_path(destination_dir: &Path, name: &str, created: &DateTime<Local>) -> PathBuf {
    destination_dir.join(format!(
        "{}_{}.{}",
        created.format(TIMESTAMP_FORMAT),
        name,
        DOCUMENT_EXTENSION
    ))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(TagSheetError::InvalidName(name.to_string()));
    }
    Ok(())
}

async fn create_unique(
    destination_dir: &Path,
    name: &str,
    created: DateTime<Local>,
) -> Result<(PathBuf, tokio::fs::File)> {
    let mut last_error = None;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let stamp = created + Duration::milliseconds(attempt);
        let path = artifact_path(destination_dir, name, &stamp);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying next timestamp", path.display());
                last_error = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(last_error
        .unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AlreadyExists))
        .into())
}

/// Size of a tile in PDF points
pub fn page_size_pt(tile: &ComposedTile) -> (f32, f32) {
    let to_pt = |px: u32| px as f32 * POINTS_PER_INCH / tile.dpi.max(1) as f32;
    (to_pt(tile.width()), to_pt(tile.height()))
}

fn build_document(tiles: &[ComposedTile], title: &str) -> Result<Document> {
    let mut doc = Document::with_version("1.7");
    let pages_tree_id = doc.new_object_id();
    let mut page_refs = Vec::with_capacity(tiles.len());

    for tile in tiles {
        let (width_pt, height_pt) = page_size_pt(tile);

        let mut image_dict = Dictionary::new();
        image_dict.set("Type", Object::Name(b"XObject".to_vec()));
        image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
        image_dict.set("Width", Object::Integer(i64::from(tile.width())));
        image_dict.set("Height", Object::Integer(i64::from(tile.height())));
        image_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        image_dict.set("BitsPerComponent", Object::Integer(8));
        let mut image_stream = Stream::new(image_dict, tile.image.as_raw().clone());
        image_stream.compress()?;
        let image_id = doc.add_object(image_stream);

        // Scale the unit image square up to the full page
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width_pt.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        height_pt.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_tree_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width_pt),
                    Object::Real(height_pt),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_refs.push(Object::Reference(page_id));
    }

    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    doc.objects.insert(pages_tree_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_tree_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(Dictionary::from_iter(vec![(
        "Title",
        Object::string_literal(title),
    )]));
    doc.trailer.set("Info", info_id);

    Ok(doc)
}
