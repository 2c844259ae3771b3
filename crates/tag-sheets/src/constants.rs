//! Shared constants for tag sheet generation
//!
//! Pixel constants apply to the raster produced by the composition engine,
//! point constants to the exported PDF.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// PDF user-space points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

// =============================================================================
// Identifier Scheme
// =============================================================================

/// Width of the zero-padded identifier embedded in corpus file names
pub const IDENTIFIER_WIDTH: usize = 5;

/// Largest identifier that still fits in `IDENTIFIER_WIDTH` digits
pub const MAX_IDENTIFIER: u32 = 99_999;

/// Maximum number of identifiers accepted by one locate call
pub const MAX_IDENTIFIERS_PER_REQUEST: usize = 100;

/// Largest valid group offset
pub const MAX_GROUP_OFFSET: i64 = 99;

/// Distance between consecutive identifiers of a group
pub const GROUP_STEP: u32 = 100;

/// Identifiers per group (levels 1 through 9)
pub const GROUP_SIZE: u32 = 9;

// =============================================================================
// Defaults
// =============================================================================

/// Default print resolution
pub const DEFAULT_DPI: u32 = 300;

/// Default printed tag edge length
pub const DEFAULT_TAG_SIZE_MM: f64 = 100.0;

/// Default legend annotation; `{collection}` and `{group}` are substituted
pub const DEFAULT_LEGEND_TEMPLATE: &str = "Collection: {collection} Group: {group}";

// =============================================================================
// Tile Layout (pixels)
// =============================================================================

/// White margin around the resized tag on each side
pub const TILE_MARGIN_PX: u32 = 50;

/// Black border around the finished tile
pub const TILE_BORDER_PX: u32 = 10;

/// Gap between the canvas and the legend band edges
pub const LEGEND_INSET_PX: u32 = 5;

/// Legend band height as a fraction of the canvas height
pub const LEGEND_BAND_RATIO: u32 = 10;

/// Legend font size on a page, as a fraction of the page height
pub const PAGE_LEGEND_FONT_RATIO: u32 = 35;

/// Vertical gap between tag and legend on a page, as a fraction of the page height
pub const PAGE_LEGEND_GAP_RATIO: u32 = 35;

/// Line spacing multiplier for legend text
pub const LEGEND_LINE_SPACING: f32 = 1.15;

/// Smallest legend font size rendered
pub const MIN_LEGEND_FONT_PX: f32 = 8.0;

/// Largest raster edge (tag or page) the composition engine accepts
pub const MAX_RASTER_PX: u32 = 32_768;
