//! Interactive tag browsing
//!
//! Holds the state of a browsing session (current identifier, its match and a
//! selection) and maps each user action onto one call into the core.

use crate::compose::{LegendFont, load_tag_image, resize_tag};
use crate::constants::MAX_IDENTIFIER;
use crate::export::export_document;
use crate::locate::locate;
use crate::options::SheetOptions;
use crate::orchestrate::{collect_tiles, compose_all};
use crate::types::*;
use image::RgbaImage;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TagBrowser {
    family: Family,
    corpus_root: PathBuf,
    current: Option<TagId>,
    current_match: Option<LocatedTag>,
    selection: Vec<LocatedTag>,
    annotation: String,
}

impl TagBrowser {
    pub fn new(family: Family, corpus_root: impl Into<PathBuf>) -> Self {
        Self {
            family,
            corpus_root: corpus_root.into(),
            current: None,
            current_match: None,
            selection: Vec::new(),
            annotation: String::new(),
        }
    }

    pub fn family(&self) -> &Family {
        &self.family
    }

    /// Switch family. The current match is dropped, the selection is kept.
    pub fn set_family(&mut self, family: Family) {
        self.family = family;
        self.current_match = None;
    }

    pub fn corpus_root(&self) -> &Path {
        &self.corpus_root
    }

    pub fn current(&self) -> Option<TagId> {
        self.current
    }

    pub fn current_match(&self) -> Option<&LocatedTag> {
        self.current_match.as_ref()
    }

    pub fn selection(&self) -> &[LocatedTag] {
        &self.selection
    }

    /// Free text printed under every generated tag
    pub fn set_annotation(&mut self, annotation: impl Into<String>) {
        self.annotation = annotation.into();
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Look up `id` and remember its first match
    pub async fn search(&mut self, id: TagId) -> Result<Option<&LocatedTag>> {
        self.current = Some(id);
        let found = locate(id, &self.family, &self.corpus_root).await?;
        self.current_match = found.into_iter().next();
        if self.current_match.is_none() {
            log::info!("ID {} not found in family {}", id, self.family);
        }
        Ok(self.current_match.as_ref())
    }

    /// Search the identifier after the current one
    pub async fn next(&mut self) -> Result<Option<&LocatedTag>> {
        let value = match self.current {
            Some(id) => (id.value() + 1).min(MAX_IDENTIFIER),
            None => 0,
        };
        self.search(TagId::new(u64::from(value))?).await
    }

    /// Search the identifier before the current one, stopping at 0
    pub async fn prev(&mut self) -> Result<Option<&LocatedTag>> {
        let value = self.current.map_or(0, |id| id.value().saturating_sub(1));
        self.search(TagId::new(u64::from(value))?).await
    }

    /// Append the current match to the selection
    pub fn add(&mut self) -> bool {
        match &self.current_match {
            Some(tag) => {
                log::debug!("Selected {} ({})", tag.id, tag.path.display());
                self.selection.push(tag.clone());
                true
            }
            None => false,
        }
    }

    /// Remove selection entries by index. Out-of-range indices are ignored.
    pub fn remove(&mut self, indices: &[usize]) {
        let mut indices: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.selection.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        for index in indices.into_iter().rev() {
            self.selection.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    /// Current match scaled to fit in a `size` x `size` square
    pub async fn preview(&self, size: u32) -> Result<Option<RgbaImage>> {
        let Some(tag) = self.current_match.clone() else {
            return Ok(None);
        };
        if size == 0 {
            return Err(TagSheetError::InvalidDimensions(
                "preview size must be positive".to_string(),
            ));
        }

        let image = tokio::task::spawn_blocking(move || {
            let source = load_tag_image(&tag.path)?;
            let (width, height) = fit_within(source.dimensions(), size);
            Ok::<_, TagSheetError>(resize_tag(&source, width, height))
        })
        .await??;
        Ok(Some(image))
    }

    /// Compose the selection in order and export it as one document
    pub async fn generate(
        &self,
        options: &SheetOptions,
        font: &LegendFont,
        name: &str,
    ) -> Result<PathBuf> {
        if self.selection.is_empty() {
            return Err(TagSheetError::EmptyDocument);
        }

        let composed = compose_all(
            self.selection.clone(),
            options.tile_settings(),
            self.annotation.clone(),
            font.clone(),
        )
        .await?;
        let batch = collect_tiles(composed, options.policy.on_tile_error)?;

        export_document(&batch.tiles, &options.output_root, name).await
    }
}

/// Largest size with the same aspect ratio that fits in `size` x `size`
fn fit_within((width, height): (u32, u32), size: u32) -> (u32, u32) {
    let longest = width.max(height).max(1);
    let scale = |side: u32| ((u64::from(side) * u64::from(size)) / u64::from(longest)).max(1) as u32;
    (scale(width), scale(height))
}
