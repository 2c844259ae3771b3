//! Tag lookup in an on-disk image corpus
//!
//! The corpus is laid out as `<root>/<family>/<files>`. A file belongs to
//! identifier `n` when the first run of five digits in its name is the
//! zero-padded form of `n`.

use crate::constants::{IDENTIFIER_WIDTH, MAX_IDENTIFIERS_PER_REQUEST};
use crate::types::*;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Identifiers to look up: one, or a list of at most 100
#[derive(Debug, Clone, PartialEq)]
pub enum IdRequest {
    Single(TagId),
    Many(Vec<TagId>),
}

impl IdRequest {
    pub fn len(&self) -> usize {
        match self {
            IdRequest::Single(_) => 1,
            IdRequest::Many(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> &[TagId] {
        match self {
            IdRequest::Single(id) => std::slice::from_ref(id),
            IdRequest::Many(ids) => ids,
        }
    }

    /// Canonical identifier strings, checking the request size
    pub fn normalized(&self) -> Result<HashSet<String>> {
        if self.len() > MAX_IDENTIFIERS_PER_REQUEST {
            return Err(TagSheetError::TooManyIdentifiers { count: self.len() });
        }
        Ok(self.ids().iter().map(|id| id.canonical()).collect())
    }
}

impl From<TagId> for IdRequest {
    fn from(id: TagId) -> Self {
        IdRequest::Single(id)
    }
}

impl From<Vec<TagId>> for IdRequest {
    fn from(ids: Vec<TagId>) -> Self {
        IdRequest::Many(ids)
    }
}

impl From<&[TagId]> for IdRequest {
    fn from(ids: &[TagId]) -> Self {
        IdRequest::Many(ids.to_vec())
    }
}

impl TryFrom<u32> for IdRequest {
    type Error = TagSheetError;

    fn try_from(value: u32) -> Result<Self> {
        Ok(IdRequest::Single(TagId::new(u64::from(value))?))
    }
}

impl TryFrom<&[u32]> for IdRequest {
    type Error = TagSheetError;

    fn try_from(values: &[u32]) -> Result<Self> {
        values
            .iter()
            .map(|&v| TagId::new(u64::from(v)))
            .collect::<Result<Vec<_>>>()
            .map(IdRequest::Many)
    }
}

/// Parses `"100"` or `"100,200, 300"`
impl FromStr for IdRequest {
    type Err = TagSheetError;

    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        let mut ids = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let value = token
                .parse::<u64>()
                .map_err(|_| TagSheetError::InvalidIdentifierType {
                    value: token.to_string(),
                })?;
            ids.push(TagId::new(value)?);
        }

        if ids.len() == 1 && !s.contains(',') {
            Ok(IdRequest::Single(ids[0]))
        } else {
            Ok(IdRequest::Many(ids))
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!("[0-9]{{{IDENTIFIER_WIDTH}}}")).expect("identifier pattern is valid")
    })
}

/// The identifier a corpus file name encodes, if any
pub fn extract_identifier(file_name: &str) -> Option<&str> {
    identifier_pattern().find(file_name).map(|m| m.as_str())
}

/// Find the corpus entries for the requested identifiers
///
/// Results follow the corpus enumeration order (file names sorted), not the
/// request order. Every file encoding a requested identifier is returned,
/// including several files for the same identifier. Identifiers without a
/// file are simply absent from the result.
pub async fn locate(
    request: impl Into<IdRequest>,
    family: &Family,
    corpus_root: impl AsRef<Path>,
) -> Result<Vec<LocatedTag>> {
    let request = request.into();
    let wanted = request.normalized()?;
    let family = family.clone();
    let family_dir = corpus_root.as_ref().join(family.as_str());

    tokio::task::spawn_blocking(move || scan_family_dir(&family_dir, &family, &wanted)).await?
}

fn scan_family_dir(
    family_dir: &Path,
    family: &Family,
    wanted: &HashSet<String>,
) -> Result<Vec<LocatedTag>> {
    if !family_dir.is_dir() {
        log::warn!(
            "No corpus directory for family {} at {}",
            family,
            family_dir.display()
        );
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(family_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(canonical) = extract_identifier(&file_name) else {
            continue;
        };
        if !wanted.contains(canonical) {
            continue;
        }

        let id = parse_identifier(canonical)?;
        let path: PathBuf = entry.path().to_path_buf();
        log::info!("Found ID {} (family {}) at {}", id, family, path.display());
        found.push(LocatedTag {
            id,
            family: family.clone(),
            path,
        });
    }

    log::debug!(
        "Located {} of {} requested identifiers in {}",
        found.len(),
        wanted.len(),
        family_dir.display()
    );
    Ok(found)
}

/// Identifier spelled by a 5-digit file-name fragment
fn parse_identifier(canonical: &str) -> Result<TagId> {
    let value = canonical
        .parse::<u64>()
        .map_err(|_| TagSheetError::InvalidIdentifierType {
            value: canonical.to_string(),
        })?;
    TagId::new(value)
}
