//! Printable sheets of fiducial markers (AprilTags) grouped by location.
//!
//! Each group owns nine identifiers derived from its offset. The matching
//! marker images are looked up in a corpus directory, scaled to their
//! physical print size, labelled and exported as one PDF per group.

pub mod browser;
pub mod compose;
pub mod constants;
pub mod export;
pub mod ids;
pub mod locate;
mod options;
pub mod orchestrate;
mod types;

pub use browser::TagBrowser;
pub use compose::{LegendFont, TileSettings, compose_tile, physical_to_pixels};
pub use export::{export_document, export_document_at};
pub use ids::{generate_collection_groups, generate_group_ids};
pub use locate::{IdRequest, locate};
pub use options::*;
pub use orchestrate::{
    CollectionPlan, GroupOutcome, GroupStatus, RunReport, SkippedTile, TagSheets,
};
pub use types::*;
