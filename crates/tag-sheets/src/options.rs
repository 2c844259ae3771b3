use crate::compose::{TileGeometry, TileSettings};
use crate::constants::{DEFAULT_DPI, DEFAULT_LEGEND_TEMPLATE, DEFAULT_TAG_SIZE_MM, MAX_RASTER_PX};
use crate::ids::generate_named_collection_groups;
use crate::types::*;
use std::collections::HashSet;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Printed edge lengths of the tag itself, legend and margins excluded
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicalSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl Default for PhysicalSize {
    fn default() -> Self {
        Self {
            width_mm: DEFAULT_TAG_SIZE_MM,
            height_mm: DEFAULT_TAG_SIZE_MM,
        }
    }
}

/// A named set of groups with consecutive offsets, e.g. one warehouse
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collection {
    pub name: String,
    pub group_names: Vec<String>,
    pub start_offset: i64,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        group_names: impl IntoIterator<Item = impl Into<String>>,
        start_offset: i64,
    ) -> Self {
        Self {
            name: name.into(),
            group_names: group_names.into_iter().map(Into::into).collect(),
            start_offset,
        }
    }

    /// Groups of this collection with their identifiers
    pub fn groups(&self) -> Result<Vec<Group>> {
        generate_named_collection_groups(&self.name, &self.group_names, self.start_offset)
    }
}

/// What to do when no tag of a group is in the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EmptyGroupPolicy {
    /// Warn and move on
    #[default]
    Skip,
    /// Abort the run
    Fail,
}

/// What to do when only some tags of a group are in the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PartialGroupPolicy {
    /// Export what was found and report the missing identifiers
    #[default]
    Allow,
    /// Export nothing for the group
    Skip,
}

/// What to do when a single source image cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TileErrorPolicy {
    /// Leave the tile out of the document
    #[default]
    SkipTile,
    /// Mark the whole group as failed and continue with the next one
    FailGroup,
}

/// Handling of incomplete groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GroupPolicy {
    pub on_empty_group: EmptyGroupPolicy,
    pub on_partial_group: PartialGroupPolicy,
    pub on_tile_error: TileErrorPolicy,
}

/// Complete configuration of a sheet generation run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetOptions {
    // Input
    pub corpus_root: PathBuf,
    pub family: Family,

    // Output
    pub output_root: PathBuf,
    pub font_path: PathBuf,

    // Rendering
    pub dpi: u32,
    pub target_tile_size_mm: PhysicalSize,
    pub layout: Layout,
    pub legend_text_template: String,

    // Groups
    pub collections: Vec<Collection>,
    pub policy: GroupPolicy,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            corpus_root: PathBuf::from("."),
            family: Family::default(),
            output_root: PathBuf::from("PDF"),
            font_path: PathBuf::from("arial.ttf"),
            dpi: DEFAULT_DPI,
            target_tile_size_mm: PhysicalSize::default(),
            layout: Layout::Tile,
            legend_text_template: DEFAULT_LEGEND_TEMPLATE.to_string(),
            collections: Vec::new(),
            policy: GroupPolicy::default(),
        }
    }
}

impl SheetOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| TagSheetError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TagSheetError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Size, resolution and layout handed to the composition engine
    pub fn tile_settings(&self) -> TileSettings {
        TileSettings {
            width_mm: self.target_tile_size_mm.width_mm,
            height_mm: self.target_tile_size_mm.height_mm,
            dpi: self.dpi,
            layout: self.layout,
        }
    }

    /// Legend annotation for one group
    pub fn legend_for(&self, collection: &str, group: &str) -> String {
        self.legend_text_template
            .replace("{collection}", collection)
            .replace("{group}", group)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 {
            return Err(TagSheetError::Config("DPI must be positive".to_string()));
        }

        let PhysicalSize {
            width_mm,
            height_mm,
        } = self.target_tile_size_mm;
        if !(width_mm.is_finite() && height_mm.is_finite() && width_mm > 0.0 && height_mm > 0.0)
        {
            return Err(TagSheetError::Config(format!(
                "Tag size must be positive, got {}x{} mm",
                width_mm, height_mm
            )));
        }
        let (width_px, height_px) = self.tile_settings().tag_pixels();
        if width_px == 0 || height_px == 0 {
            return Err(TagSheetError::Config(format!(
                "Tag size {}x{} mm is below one pixel at {} dpi",
                width_mm, height_mm, self.dpi
            )));
        }
        if width_px > MAX_RASTER_PX || height_px > MAX_RASTER_PX {
            return Err(TagSheetError::Config(format!(
                "Tag size {}x{} mm is {}x{}px at {} dpi, larger than {}px",
                width_mm, height_mm, width_px, height_px, self.dpi, MAX_RASTER_PX
            )));
        }

        if let Layout::Page { paper } = self.layout {
            let (paper_width, paper_height) = paper.dimensions_mm();
            if !(paper_width.is_finite()
                && paper_height.is_finite()
                && paper_width > 0.0
                && paper_height > 0.0)
            {
                return Err(TagSheetError::Config(format!(
                    "Paper size must be positive, got {}x{} mm",
                    paper_width, paper_height
                )));
            }
        }

        // Longest legend is the two fixed lines plus the rendered template
        let legend_lines = 2 + self
            .legend_text_template
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count();
        TileGeometry::compute(self.layout, (width_px, height_px), self.dpi, legend_lines).map_err(
            |e| match e {
                TagSheetError::InvalidDimensions(reason) => TagSheetError::Config(reason),
                other => other,
            },
        )?;

        if !self.family.is_known() {
            log::warn!(
                "Family '{}' is not a standard AprilTag family, expecting images under {}",
                self.family,
                self.corpus_root.join(self.family.as_str()).display()
            );
        }

        let mut names = HashSet::new();
        for collection in &self.collections {
            if collection.name.trim().is_empty() {
                return Err(TagSheetError::Config(
                    "Collection name must not be empty".to_string(),
                ));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(TagSheetError::Config(format!(
                    "Collection '{}' is defined more than once",
                    collection.name
                )));
            }
            if let Some(blank) = collection.group_names.iter().find(|n| n.trim().is_empty()) {
                return Err(TagSheetError::Config(format!(
                    "Collection '{}' has an empty group name '{}'",
                    collection.name, blank
                )));
            }
            collection.groups()?;
        }

        Ok(())
    }
}
