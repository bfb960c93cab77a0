//! Structural overview of the files in a snapshot: top-level components,
//! file types, naming patterns and nesting depth.
//!
//! Everything is derived from snapshot keys alone, so the overview of a
//! document does not depend on where it was assembled.

use crate::language::fence_language;
use std::collections::BTreeMap;
use std::path::Path;

/// Conventions recognized from file and directory names. An indicator ending
/// in `/` matches a directory segment; any other indicator matches part of a
/// lowercased file name.
const PATTERNS: &[(&str, &[&str])] = &[
    (
        "Model-View-Controller layout",
        &["model.", "view.", "controller."],
    ),
    (
        "Organized test structure",
        &["test_", "_test.", "tests.", "tests/", "test/"],
    ),
    (
        "Centralized configuration files",
        &[".env", "config.", "settings.", "pyproject.toml", "cargo.toml"],
    ),
    ("Structured documentation", &["readme", "docs/", "documentation/"]),
    (
        "API/Routes architecture",
        &["routes.", "api.", "endpoints.", "handlers."],
    ),
    (
        "Persistence/Database layer",
        &["models.", "schema.", "migrations/", "db."],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileTypeShare {
    /// Extension with its leading dot, or the whole name for files without
    /// one (`Dockerfile`).
    pub extension: String,
    pub language: &'static str,
    pub files: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchitectureOverview {
    /// First directory segments, sorted by name.
    pub components: Vec<Component>,
    /// Sorted by file count, most common first.
    pub file_types: Vec<FileTypeShare>,
    /// Descriptions of the detected patterns, sorted.
    pub patterns: Vec<&'static str>,
    /// Directories above the deepest file; zero when every file sits at the
    /// snapshot root.
    pub max_depth: usize,
    pub depth_distribution: BTreeMap<usize, usize>,
}

impl ArchitectureOverview {
    pub fn analyze<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys: Vec<&str> = keys.into_iter().collect();
        let mut overview = ArchitectureOverview::default();
        if keys.is_empty() {
            return overview;
        }

        let mut components: BTreeMap<&str, usize> = BTreeMap::new();
        let mut file_types: BTreeMap<String, usize> = BTreeMap::new();

        for key in &keys {
            let segments: Vec<&str> = key.split('/').collect();
            let depth = segments.len() - 1;
            *overview.depth_distribution.entry(depth).or_default() += 1;
            overview.max_depth = overview.max_depth.max(depth);

            if depth > 0 {
                *components.entry(segments[0]).or_default() += 1;
            }
            *file_types.entry(file_type(key)).or_default() += 1;
        }

        overview.components = components
            .into_iter()
            .map(|(name, files)| Component {
                name: name.to_string(),
                files,
            })
            .collect();

        let total = keys.len() as f64;
        let mut file_types: Vec<FileTypeShare> = file_types
            .into_iter()
            .map(|(extension, files)| FileTypeShare {
                language: language_of(&extension),
                percentage: files as f64 * 100.0 / total,
                extension,
                files,
            })
            .collect();
        // Stable, so equal counts stay in extension order.
        file_types.sort_by(|a, b| b.files.cmp(&a.files));
        overview.file_types = file_types;

        overview.patterns = PATTERNS
            .iter()
            .filter(|(_, indicators)| keys.iter().any(|key| matches_any(key, indicators)))
            .map(|(description, _)| *description)
            .collect();
        overview.patterns.sort_unstable();

        overview
    }

    pub fn is_empty(&self) -> bool {
        self.depth_distribution.is_empty()
    }

    /// Markdown section for the document header. Empty for an empty overview.
    pub fn to_markdown(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut text = String::from("## Architecture\n\n");

        if !self.components.is_empty() {
            text.push_str("### Components\n\n| Component | Files |\n|---|---|\n");
            for component in &self.components {
                text.push_str(&format!("| {}/ | {} |\n", component.name, component.files));
            }
            text.push('\n');
        }

        text.push_str("### File Types\n\n| Extension | Language | Files | Share |\n|---|---|---|---|\n");
        for share in &self.file_types {
            text.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                share.extension, share.language, share.files, share.percentage
            ));
        }
        text.push('\n');

        if !self.patterns.is_empty() {
            text.push_str("### Detected Patterns\n\n");
            for pattern in &self.patterns {
                text.push_str(&format!("- {pattern}\n"));
            }
            text.push('\n');
        }

        text.push_str(&format!(
            "### Depth\n\nMaximum directory depth: {}\n\n| Depth | Files |\n|---|---|\n",
            self.max_depth
        ));
        for (depth, files) in &self.depth_distribution {
            text.push_str(&format!("| {depth} | {files} |\n"));
        }
        text.push('\n');

        text
    }
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn file_type(key: &str) -> String {
    let name = file_name(key);
    match name.rfind('.') {
        Some(dot) if dot > 0 => name[dot..].to_lowercase(),
        _ => name.to_string(),
    }
}

fn language_of(extension: &str) -> &'static str {
    let probe = if extension.starts_with('.') {
        format!("file{extension}")
    } else {
        extension.to_string()
    };
    fence_language(Path::new(&probe))
}

fn matches_any(key: &str, indicators: &[&str]) -> bool {
    let lowered = key.to_lowercase();
    let (directories, name) = match lowered.rfind('/') {
        Some(slash) => (&lowered[..slash], &lowered[slash + 1..]),
        None => ("", lowered.as_str()),
    };
    indicators.iter().any(|indicator| match indicator.strip_suffix('/') {
        Some(segment) => directories.split('/').any(|dir| dir == segment),
        None => name.contains(indicator),
    })
}
