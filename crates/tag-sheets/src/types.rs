use crate::constants::{IDENTIFIER_WIDTH, MAX_IDENTIFIER};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagSheetError {
    #[error("Group offset {offset} is out of range (must be between 0 and 99)")]
    InvalidRange { offset: i64 },
    #[error("Group name '{name}' appears more than once in collection '{collection}'")]
    DuplicateGroupName { collection: String, name: String },
    #[error("Too many identifiers requested: {count} (at most 100)")]
    TooManyIdentifiers { count: usize },
    #[error("'{value}' is not a non-negative integer identifier")]
    InvalidIdentifierType { value: String },
    #[error("Identifier {value} does not fit in 5 digits")]
    InvalidIdentifier { value: u64 },
    #[error("Invalid family name '{0}'")]
    InvalidFamily(String),
    #[error("Cannot export a document without pages")]
    EmptyDocument,
    #[error("No tags found for group '{group}'")]
    EmptyGroup { group: String },
    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Tag of {tag_width}x{tag_height}px does not fit on a {page_width}x{page_height}px page")]
    TagDoesNotFit {
        tag_width: u32,
        tag_height: u32,
        page_width: u32,
        page_height: u32,
    },
    #[error("Font not found: {}", path.display())]
    FontNotFound { path: PathBuf },
    #[error("Invalid font file: {}", path.display())]
    InvalidFont { path: PathBuf },
    #[error("Failed to decode tag image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Corpus scan error: {0}")]
    Corpus(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl TagSheetError {
    /// Errors that concern a single source image. Everything else stops the run.
    pub fn is_tile_local(&self) -> bool {
        matches!(self, TagSheetError::ImageDecode { .. })
    }

    /// Errors that stop the run whatever the tile policy says
    pub fn is_fatal(&self) -> bool {
        !self.is_tile_local()
    }
}

pub type Result<T> = std::result::Result<T, TagSheetError>;

/// Numeric tag identifier, always representable as 5 zero-padded digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u64", into = "u32"))]
pub struct TagId(u32);

impl TagId {
    pub fn new(value: u64) -> Result<Self> {
        if value > MAX_IDENTIFIER as u64 {
            return Err(TagSheetError::InvalidIdentifier { value });
        }
        Ok(Self(value as u32))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Zero-padded form used to match corpus file names
    pub fn canonical(self) -> String {
        format!("{:0width$}", self.0, width = IDENTIFIER_WIDTH)
    }
}

impl TryFrom<u64> for TagId {
    type Error = TagSheetError;

    fn try_from(value: u64) -> Result<Self> {
        TagId::new(value)
    }
}

impl From<TagId> for u32 {
    fn from(id: TagId) -> Self {
        id.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Marker family, also the name of the corpus sub-directory holding its images
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Family(String);

impl Family {
    /// Families shipped by the standard AprilTag image sets
    pub const KNOWN: &'static [&'static str] = &[
        "tag16h5",
        "tag25h9",
        "tag36h11",
        "tagCircle21h7",
        "tagCircle49h12",
        "tagCustom48h12",
        "tagStandard41h12",
        "tagStandard52h13",
    ];

    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\'])
        {
            return Err(TagSheetError::InvalidFamily(name));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.0.as_str())
    }
}

impl Default for Family {
    fn default() -> Self {
        Self("tagStandard41h12".to_string())
    }
}

impl TryFrom<String> for Family {
    type Error = TagSheetError;

    fn try_from(value: String) -> Result<Self> {
        Family::new(value)
    }
}

impl From<Family> for String {
    fn from(family: Family) -> Self {
        family.0
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named group and its derived identifiers, in legend order
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub offset: u8,
    pub ids: Vec<TagId>,
}

/// A corpus entry matched by the locator. The image is not decoded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTag {
    pub id: TagId,
    pub family: Family,
    pub path: PathBuf,
}

/// A rendered page ready for export
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedTile {
    pub image: image::RgbImage,
    pub id: TagId,
    pub family: Family,
    pub dpi: u32,
}

impl ComposedTile {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f64, height_mm: f64 },
}

impl PaperSize {
    /// Portrait dimensions in millimeters
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

/// How a tag is placed on its output page
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layout {
    /// Tag plus margin, legend band underneath, black border around it all
    #[default]
    Tile,
    /// Tag centered on a full sheet of paper with the legend below it
    Page { paper: PaperSize },
}
