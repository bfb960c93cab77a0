//! Candidate discovery for snapshot assembly.
//!
//! Walks the configured paths and keeps regular files whose names pass the
//! [`NameFilter`]. Symlinks are not followed. Excluded directories are pruned
//! before descent, so a large `node_modules` costs one directory entry.

use crate::config::{AssembleConfig, NameFilter, README_FILENAMES};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum FileListError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

fn io_error(e: std::io::Error, path: &Path) -> FileListError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        FileListError::PermissionDenied(path.to_path_buf())
    } else {
        FileListError::Io(e)
    }
}

/// Exclusion rules compiled from the configured patterns.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    /// Lowercased single-segment patterns.
    segments: Vec<String>,
    /// Absolute paths excluded along with everything beneath them.
    prefixes: Vec<PathBuf>,
}

impl ExcludeRules {
    /// Patterns containing a slash are resolved against `base`.
    pub fn new(patterns: &[String], base: &Path) -> Self {
        let mut rules = ExcludeRules::default();
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if pattern.contains(['/', '\\']) {
                let joined = base.join(pattern.trim_end_matches(['/', '\\']));
                let resolved = joined.canonicalize().unwrap_or(joined);
                rules.prefixes.push(resolved);
            } else {
                rules.segments.push(pattern.to_lowercase());
            }
        }
        rules
    }

    fn segment_excluded(&self, segment: &str) -> bool {
        let segment = segment.to_lowercase();
        self.segments.iter().any(|pattern| {
            segment == *pattern || (pattern.starts_with('.') && segment.ends_with(pattern.as_str()))
        })
    }

    /// Whether `path` is excluded. Only the segments below `root` are
    /// checked, so a project that lives under `/srv/build` is still walked.
    pub fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        if self.prefixes.iter().any(|prefix| path.starts_with(prefix)) {
            return true;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative
            .iter()
            .any(|segment| self.segment_excluded(&segment.to_string_lossy()))
    }
}

/// All files the configuration selects, as canonical absolute paths.
///
/// Paths in `skip` (the output document, a `--since` baseline) are never
/// returned. Configured paths that do not exist are reported and ignored.
pub fn collect_candidates(
    config: &AssembleConfig,
    skip: &[PathBuf],
) -> Result<BTreeSet<PathBuf>, FileListError> {
    let cwd = std::env::current_dir().map_err(FileListError::Io)?;
    let filter = NameFilter::from_tokens(&config.extensions);
    let rules = ExcludeRules::new(&config.effective_excludes(), &cwd);
    let skip: Vec<PathBuf> = skip.iter().map(|path| resolve(path, &cwd)).collect();

    let mut candidates = BTreeSet::new();

    for configured in &config.paths {
        if !configured.exists() {
            warn!("Path does not exist: {}", configured.display());
            continue;
        }
        let root = configured
            .canonicalize()
            .map_err(|e| io_error(e, configured))?;

        if root.is_file() {
            let name = file_name(&root);
            if filter.matches(&name) && !skip.contains(&root) {
                candidates.insert(root);
            } else {
                debug!("Ignoring {}: not selected", root.display());
            }
            continue;
        }

        for entry in walk(&root, config.recursive, &rules) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if skip.contains(&path) {
                debug!("Skipping {}: snapshot document", path.display());
                continue;
            }
            if filter.matches(&file_name(&path)) {
                candidates.insert(path);
            }
        }
    }

    debug!("Collected {} candidate files", candidates.len());
    Ok(candidates)
}

/// README files of the walked directories, at most one per directory, in
/// walk order.
///
/// Roots, depth and exclusions are the same as for [`collect_candidates`].
/// A non-recursive run only looks at the top of each configured directory.
pub fn collect_readmes(
    config: &AssembleConfig,
    skip: &[PathBuf],
) -> Result<Vec<PathBuf>, FileListError> {
    let cwd = std::env::current_dir().map_err(FileListError::Io)?;
    let rules = ExcludeRules::new(&config.effective_excludes(), &cwd);
    let skip: Vec<PathBuf> = skip.iter().map(|path| resolve(path, &cwd)).collect();

    let mut readmes = Vec::new();
    for configured in &config.paths {
        let Ok(root) = configured.canonicalize() else {
            continue;
        };
        if !root.is_dir() {
            continue;
        }

        let directories = walk(&root, config.recursive, &rules)
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| config.recursive || entry.depth() == 0)
            .map(walkdir::DirEntry::into_path);

        for dir in directories {
            let readme = README_FILENAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| {
                    path.is_file() && !skip.contains(path) && !rules.is_excluded(&root, path)
                });
            if let Some(readme) = readme
                && !readmes.contains(&readme)
            {
                debug!("Found README {}", readme.display());
                readmes.push(readme);
            }
        }
    }

    Ok(readmes)
}

/// Sorted walk below `root` that prunes excluded entries and reports
/// unreadable ones.
fn walk<'a>(
    root: &'a Path,
    recursive: bool,
    rules: &'a ExcludeRules,
) -> impl Iterator<Item = walkdir::DirEntry> + 'a {
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| entry.depth() == 0 || !rules.is_excluded(root, entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                None
            }
        })
}

/// Canonical form of a path that may not exist yet, such as an output
/// document about to be written for the first time.
fn resolve(path: &Path, cwd: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = cwd.join(path);
    match (
        absolute.parent().and_then(|parent| parent.canonicalize().ok()),
        absolute.file_name(),
    ) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => absolute,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
