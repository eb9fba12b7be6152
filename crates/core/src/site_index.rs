//! `llms.txt`-style index of every curated artifact.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use serde::Serialize;
use walkdir::WalkDir;

use crate::Result;
use crate::frontmatter::parse_artifact;
use crate::path::is_valid_path;
use crate::signal::MARKDOWN_SUFFIX;
use crate::store::is_route_group;

/// One indexed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Logical path of the page.
    pub path: String,
    pub title: String,
}

impl IndexEntry {
    /// Link to the Markdown form of the page.
    pub fn markdown_url(&self) -> String {
        format!("{}{}", self.path.trim_end_matches('/'), MARKDOWN_SUFFIX)
    }
}

/// All indexed pages, sorted by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteIndex {
    pub title: String,
    pub entries: Vec<IndexEntry>,
}

impl SiteIndex {
    pub fn render(&self) -> String {
        let mut out = format!("# {}\n\n", self.title);
        for entry in &self.entries {
            out.push_str(&format!("- [{}]({})\n", entry.title, entry.markdown_url()));
        }
        out
    }
}

/// Walks `root` for artifacts named `artifact_name`.
///
/// Each path is decided by the artifact a lookup would serve: the direct one,
/// else the first route group in name order. When that artifact carries a
/// redirect the path is left out, since it resolves elsewhere.
pub fn build_site_index(root: &Path, artifact_name: &str, title: &str) -> Result<SiteIndex> {
    let mut found: BTreeMap<String, (bool, Option<IndexEntry>)> = BTreeMap::new();

    if !root.is_dir() {
        return Ok(SiteIndex { title: title.to_string(), entries: Vec::new() });
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != artifact_name {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Some((path, grouped)) = logical_path(relative) else {
            continue;
        };
        if found.get(&path).is_some_and(|(existing_grouped, _)| !existing_grouped || grouped) {
            continue;
        }

        let text = fs::read_to_string(entry.path())?;
        let artifact = parse_artifact(&text);
        if artifact.redirect_target.is_some() {
            found.insert(path, (grouped, None));
            continue;
        }

        let page_title = artifact
            .field("title")
            .or_else(|| first_heading(&artifact.body))
            .unwrap_or_else(|| path.clone());
        found.insert(path.clone(), (grouped, Some(IndexEntry { path, title: page_title })));
    }

    Ok(SiteIndex { title: title.to_string(), entries: found.into_values().filter_map(|(_, entry)| entry).collect() })
}

/// Logical path for an artifact location, and whether it sat in a route group.
fn logical_path(relative: &Path) -> Option<(String, bool)> {
    let mut segments = Vec::new();
    for component in relative.parent()?.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }

    let grouped = segments.first().is_some_and(|first| is_route_group(first));
    if grouped {
        segments.remove(0);
    }

    let path = format!("/{}", segments.join("/"));
    is_valid_path(&path).then_some((path, grouped))
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.trim().strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}
