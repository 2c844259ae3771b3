//! Group orchestration
//!
//! Drives the whole pipeline for every configured group:
//! identifiers -> locate -> compose -> export, one document per group.
//! Groups are processed one after another in configuration order.

use crate::compose::{LegendFont, TileSettings, compose_tile};
use crate::export::export_document;
use crate::locate::{IdRequest, locate};
use crate::options::*;
use crate::types::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Identifier table of one collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPlan {
    pub name: String,
    pub groups: Vec<Group>,
}

/// A tile left out of its document
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTile {
    pub id: TagId,
    pub path: PathBuf,
    pub reason: String,
}

/// What happened to one group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupStatus {
    Exported {
        path: PathBuf,
        pages: usize,
        missing: Vec<TagId>,
        skipped_tiles: Vec<SkippedTile>,
    },
    Skipped {
        reason: String,
        missing: Vec<TagId>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub collection: String,
    pub group: String,
    pub status: GroupStatus,
}

/// Per-group results of a run, in processing order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub groups: Vec<GroupOutcome>,
}

impl RunReport {
    /// Paths of all documents written by the run
    pub fn artifacts(&self) -> Vec<&Path> {
        self.groups
            .iter()
            .filter_map(|outcome| match &outcome.status {
                GroupStatus::Exported { path, .. } => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    pub fn exported_count(&self) -> usize {
        self.artifacts().len()
    }

    pub fn skipped_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|o| matches!(o.status, GroupStatus::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|o| matches!(o.status, GroupStatus::Failed { .. }))
            .count()
    }

    pub fn find(&self, collection: &str, group: &str) -> Option<&GroupOutcome> {
        self.groups
            .iter()
            .find(|o| o.collection == collection && o.group == group)
    }
}

/// A validated configuration with its legend font loaded
#[derive(Debug, Clone)]
pub struct TagSheets {
    options: SheetOptions,
    font: LegendFont,
}

impl TagSheets {
    /// Validate `options` and load the legend font.
    ///
    /// Nothing is read from the corpus or written before both succeed.
    pub async fn new(options: SheetOptions) -> Result<Self> {
        options.validate()?;
        let font = LegendFont::load(&options.font_path).await?;
        log::debug!("Legend font loaded from {}", font.path().display());
        Ok(Self { options, font })
    }

    /// Generate one document per configured group
    pub async fn run(options: &SheetOptions) -> Result<RunReport> {
        Self::new(options.clone()).await?.generate().await
    }

    /// Compose an explicit identifier request into a single document
    pub async fn run_adhoc(
        options: &SheetOptions,
        request: impl Into<IdRequest>,
        name: &str,
        annotation: &str,
    ) -> Result<PathBuf> {
        Self::new(options.clone())
            .await?
            .generate_adhoc(request, name, annotation)
            .await
    }

    /// Identifier table of every configured collection, without any I/O
    pub fn plan(options: &SheetOptions) -> Result<Vec<CollectionPlan>> {
        options.validate()?;
        options
            .collections
            .iter()
            .map(|collection| {
                Ok(CollectionPlan {
                    name: collection.name.clone(),
                    groups: collection.groups()?,
                })
            })
            .collect()
    }

    pub fn options(&self) -> &SheetOptions {
        &self.options
    }

    pub fn font(&self) -> &LegendFont {
        &self.font
    }

    /// Process every group of every collection
    pub async fn generate(&self) -> Result<RunReport> {
        // Whole table first, so a bad collection stops the run before any output
        let plan = Self::plan(&self.options)?;
        let mut report = RunReport::default();

        for collection in &plan {
            log::info!(
                "Collection {}: {} groups",
                collection.name,
                collection.groups.len()
            );
            for group in &collection.groups {
                let status = self.process_group(&collection.name, group).await?;
                report.groups.push(GroupOutcome {
                    collection: collection.name.clone(),
                    group: group.name.clone(),
                    status,
                });
            }
        }

        log::info!(
            "Run finished: {} exported, {} skipped, {} failed",
            report.exported_count(),
            report.skipped_count(),
            report.failed_count()
        );
        Ok(report)
    }

    /// Locate `request`, compose every match and export them as `name`
    pub async fn generate_adhoc(
        &self,
        request: impl Into<IdRequest>,
        name: &str,
        annotation: &str,
    ) -> Result<PathBuf> {
        let located = locate(request, &self.options.family, &self.options.corpus_root).await?;
        if located.is_empty() {
            return Err(TagSheetError::EmptyDocument);
        }

        let composed = compose_all(
            located,
            self.options.tile_settings(),
            annotation.to_string(),
            self.font.clone(),
        )
        .await?;
        let batch = collect_tiles(composed, self.options.policy.on_tile_error)?;

        export_document(&batch.tiles, &self.options.output_root, name).await
    }

    async fn process_group(&self, collection: &str, group: &Group) -> Result<GroupStatus> {
        log::info!(
            "Group {} (collection {}, offset {})",
            group.name,
            collection,
            group.offset
        );
        let policy = self.options.policy;

        let located = locate(
            group.ids.clone(),
            &self.options.family,
            &self.options.corpus_root,
        )
        .await?;
        let missing = missing_ids(&group.ids, &located);

        if located.is_empty() {
            return match policy.on_empty_group {
                EmptyGroupPolicy::Skip => {
                    log::warn!("No tags found for group {}, skipping", group.name);
                    Ok(GroupStatus::Skipped {
                        reason: "no tags found".to_string(),
                        missing,
                    })
                }
                EmptyGroupPolicy::Fail => Err(TagSheetError::EmptyGroup {
                    group: group.name.clone(),
                }),
            };
        }

        if !missing.is_empty() {
            let listed = missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            log::warn!("Group {} is missing IDs: {}", group.name, listed);
            if policy.on_partial_group == PartialGroupPolicy::Skip {
                return Ok(GroupStatus::Skipped {
                    reason: format!("missing {} of {} tags", missing.len(), group.ids.len()),
                    missing,
                });
            }
        }

        let annotation = self.options.legend_for(collection, &group.name);
        let attempted = located.len();
        let composed = compose_all(
            located,
            self.options.tile_settings(),
            annotation,
            self.font.clone(),
        )
        .await?;

        let ComposedBatch {
            tiles,
            skipped: skipped_tiles,
        } = match collect_tiles(composed, policy.on_tile_error) {
            Ok(batch) => batch,
            Err(e) if e.is_tile_local() => {
                log::error!("Group {} failed: {}", group.name, e);
                return Ok(GroupStatus::Failed {
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if tiles.is_empty() {
            log::error!("Group {}: all {} tiles failed", group.name, attempted);
            return Ok(GroupStatus::Failed {
                error: format!("all {} tiles failed", attempted),
            });
        }

        let pages = tiles.len();
        let path = export_document(&tiles, &self.options.output_root, &group.name).await?;
        Ok(GroupStatus::Exported {
            path,
            pages,
            missing,
            skipped_tiles,
        })
    }
}

/// Compose tiles off the async runtime, keeping each result next to its source
pub(crate) async fn compose_all(
    tags: Vec<LocatedTag>,
    settings: TileSettings,
    annotation: String,
    font: LegendFont,
) -> Result<Vec<(LocatedTag, Result<ComposedTile>)>> {
    let results = tokio::task::spawn_blocking(move || {
        tags.into_iter()
            .map(|tag| {
                let result = compose_tile(&tag, &settings, &annotation, &font);
                (tag, result)
            })
            .collect::<Vec<_>>()
    })
    .await?;
    Ok(results)
}

/// Pages of one document and the sources left out of it
#[derive(Debug, Default)]
pub(crate) struct ComposedBatch {
    pub tiles: Vec<ComposedTile>,
    pub skipped: Vec<SkippedTile>,
}

/// Apply the tile error policy to `compose_all` results, keeping their order.
///
/// Fatal errors are always returned. A tile-local error is recorded under
/// `SkipTile` and returned under `FailGroup`.
pub(crate) fn collect_tiles(
    composed: Vec<(LocatedTag, Result<ComposedTile>)>,
    on_tile_error: TileErrorPolicy,
) -> Result<ComposedBatch> {
    let mut batch = ComposedBatch {
        tiles: Vec::with_capacity(composed.len()),
        skipped: Vec::new(),
    };
    for (tag, result) in composed {
        match result {
            Ok(tile) => batch.tiles.push(tile),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => match on_tile_error {
                TileErrorPolicy::SkipTile => {
                    log::warn!("Skipping tile {}: {}", tag.path.display(), e);
                    batch.skipped.push(SkippedTile {
                        id: tag.id,
                        path: tag.path,
                        reason: e.to_string(),
                    });
                }
                TileErrorPolicy::FailGroup => return Err(e),
            },
        }
    }
    Ok(batch)
}

/// Requested identifiers without any corpus entry, in request order
fn missing_ids(requested: &[TagId], located: &[LocatedTag]) -> Vec<TagId> {
    let found: HashSet<TagId> = located.iter().map(|tag| tag.id).collect();
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(id: u64) -> LocatedTag {
        LocatedTag {
            id: TagId::new(id).unwrap(),
            family: Family::default(),
            path: PathBuf::from(format!("tag_{:05}.png", id)),
        }
    }

    #[test]
    fn test_missing_ids_keeps_request_order() {
        let requested: Vec<TagId> = [100, 200, 300, 400]
            .into_iter()
            .map(|v| TagId::new(v).unwrap())
            .collect();
        let found = vec![located(300), located(100), located(100)];

        let missing = missing_ids(&requested, &found);
        assert_eq!(
            missing,
            vec![TagId::new(200).unwrap(), TagId::new(400).unwrap()]
        );
    }

    fn rendered(id: u64) -> Result<ComposedTile> {
        Ok(ComposedTile {
            image: image::RgbImage::new(4, 4),
            id: TagId::new(id).unwrap(),
            family: Family::default(),
            dpi: 100,
        })
    }

    fn undecodable(id: u64) -> Result<ComposedTile> {
        Err(TagSheetError::ImageDecode {
            path: located(id).path,
            source: image::ImageError::IoError(std::io::Error::other("truncated")),
        })
    }

    #[test]
    fn test_collect_tiles_skips_undecodable_sources() {
        let composed = vec![
            (located(100), rendered(100)),
            (located(101), undecodable(101)),
            (located(102), rendered(102)),
        ];

        let batch = collect_tiles(composed, TileErrorPolicy::SkipTile).unwrap();
        let pages: Vec<u32> = batch.tiles.iter().map(|t| t.id.value()).collect();
        assert_eq!(pages, vec![100, 102]);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].id.value(), 101);
        assert_eq!(batch.skipped[0].path, PathBuf::from("tag_00101.png"));
    }

    #[test]
    fn test_collect_tiles_fail_group_returns_tile_error() {
        let composed = vec![
            (located(100), rendered(100)),
            (located(101), undecodable(101)),
        ];

        let result = collect_tiles(composed, TileErrorPolicy::FailGroup);
        assert!(matches!(result, Err(TagSheetError::ImageDecode { .. })));
    }

    #[test]
    fn test_collect_tiles_fatal_error_ignores_policy() {
        for policy in [TileErrorPolicy::SkipTile, TileErrorPolicy::FailGroup] {
            let composed = vec![
                (located(100), undecodable(100)),
                (located(101), Err(TagSheetError::Config("dpi must be positive".into()))),
            ];
            let result = collect_tiles(composed, policy);
            match policy {
                TileErrorPolicy::SkipTile => {
                    assert!(matches!(result, Err(TagSheetError::Config(_))))
                }
                TileErrorPolicy::FailGroup => {
                    assert!(matches!(result, Err(TagSheetError::ImageDecode { .. })))
                }
            }
        }
    }

    #[test]
    fn test_plan_lists_groups_per_collection() {
        let options = SheetOptions {
            collections: vec![
                Collection::new("W10A", ["JC", "JD"], 0),
                Collection::new("W10B", ["KA"], 9),
            ],
            ..Default::default()
        };

        let plan = TagSheets::plan(&options).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].groups[1].name, "JD");
        assert_eq!(plan[0].groups[1].ids[0].value(), 101);
        assert_eq!(plan[1].groups[0].ids[8].value(), 909);
    }

    #[test]
    fn test_plan_rejects_invalid_configuration() {
        let options = SheetOptions {
            collections: vec![Collection::new("W10A", ["JC", "JC"], 0)],
            ..Default::default()
        };
        assert!(matches!(
            TagSheets::plan(&options),
            Err(TagSheetError::DuplicateGroupName { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_font_aborts_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let options = SheetOptions {
            corpus_root: dir.path().to_path_buf(),
            output_root: dir.path().join("PDF"),
            font_path: dir.path().join("missing.ttf"),
            collections: vec![Collection::new("W10A", ["JC"], 0)],
            ..Default::default()
        };

        let result = TagSheets::run(&options).await;
        assert!(matches!(result, Err(TagSheetError::FontNotFound { .. })));
        assert!(!dir.path().join("PDF").exists());
    }

    #[test]
    fn test_report_counts() {
        let report = RunReport {
            groups: vec![
                GroupOutcome {
                    collection: "W10A".into(),
                    group: "JC".into(),
                    status: GroupStatus::Exported {
                        path: PathBuf::from("PDF/a_JC.pdf"),
                        pages: 9,
                        missing: vec![],
                        skipped_tiles: vec![],
                    },
                },
                GroupOutcome {
                    collection: "W10A".into(),
                    group: "JD".into(),
                    status: GroupStatus::Skipped {
                        reason: "no tags found".into(),
                        missing: vec![],
                    },
                },
            ],
        };
        assert_eq!(report.exported_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 0);
        assert_eq!(report.artifacts(), vec![Path::new("PDF/a_JC.pdf")]);
        assert!(report.find("W10A", "JD").is_some());
    }
}
