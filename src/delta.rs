use crate::path_match::{common_root, match_key, relative_key};
use crate::snapshot_meta::{MinuteStamp, SnapshotMetadata};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SUMMARY_NAME_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeltaKind {
    Modified,
    Added,
    Deleted,
}

impl DeltaKind {
    pub fn code(self) -> &'static str {
        match self {
            DeltaKind::Modified => "M",
            DeltaKind::Added => "A",
            DeltaKind::Deleted => "D",
        }
    }
}

/// The partition of current files against a prior snapshot.
///
/// `modified` and `added` hold current absolute paths; `deleted` holds
/// snapshot keys, since those files no longer exist to have a path.
/// Unchanged files appear in none of the sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaResult {
    pub modified: BTreeSet<PathBuf>,
    pub added: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<String>,
    /// False when the prior document had no usable metadata and every
    /// candidate was classified as added.
    pub baseline_found: bool,
}

impl DeltaResult {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    /// Files the assembly pipeline has to read and emit.
    pub fn working_set(&self) -> BTreeSet<PathBuf> {
        self.modified.union(&self.added).cloned().collect()
    }

    /// One entry per changed item, sorted by path for display.
    pub fn entries(&self) -> Vec<(DeltaKind, String)> {
        let mut entries: Vec<(DeltaKind, String)> = self
            .modified
            .iter()
            .map(|p| (DeltaKind::Modified, p.display().to_string()))
            .chain(
                self.added
                    .iter()
                    .map(|p| (DeltaKind::Added, p.display().to_string())),
            )
            .chain(self.deleted.iter().map(|k| (DeltaKind::Deleted, k.clone())))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        entries
    }
}

/// Compare the current candidate files against the metadata embedded in
/// `prior_document`.
///
/// This never fails. A document that cannot be read or carries no metadata
/// yields a result where every candidate is added, so no content is silently
/// dropped from the next snapshot.
pub fn reconcile(prior_document: &Path, candidates: &BTreeSet<PathBuf>) -> DeltaResult {
    let snapshot = SnapshotMetadata::decode_file(prior_document);
    if snapshot.is_none() {
        info!(
            "No snapshot metadata in {}; treating all files as new",
            prior_document.display()
        );
    }
    reconcile_with(snapshot.as_ref(), candidates, current_stamp)
}

/// Like [`reconcile`], with the baseline already decoded and the
/// modification time lookup supplied by the caller.
///
/// # Matching
///
/// Each candidate is keyed by its path relative to the common root of all
/// candidates. Exact key matches are taken first for every candidate; the
/// remaining candidates (in sorted order) then try suffix matching against
/// the keys nobody has claimed yet. A key is consumed by at most one file.
///
/// # Change detection
///
/// A matched file is modified when its minute-truncated modification time
/// differs from the recorded one. A file whose time cannot be read, or whose
/// recorded time does not parse, counts as modified.
pub fn reconcile_with<F>(
    snapshot: Option<&SnapshotMetadata>,
    candidates: &BTreeSet<PathBuf>,
    stamp_of: F,
) -> DeltaResult
where
    F: Fn(&Path) -> std::io::Result<MinuteStamp>,
{
    let Some(snapshot) = snapshot else {
        return DeltaResult {
            added: candidates.clone(),
            ..DeltaResult::default()
        };
    };

    let root = common_root(candidates.iter().map(PathBuf::as_path))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();
    debug!("Reconciling against common root {}", root.display());

    let mut result = DeltaResult {
        baseline_found: true,
        ..DeltaResult::default()
    };

    // Paths that differ only in non-UTF-8 bytes share a lossy key; only the
    // first of them can stand for that key.
    let mut relative: Vec<(String, &PathBuf)> = Vec::with_capacity(candidates.len());
    let mut seen_keys: HashSet<String> = HashSet::with_capacity(candidates.len());
    for path in candidates {
        let rel = relative_key(&root, path);
        if seen_keys.insert(rel.clone()) {
            relative.push((rel, path));
        } else {
            warn!(
                "{} shares snapshot key {rel} with another file; treating it as new",
                path.display()
            );
            result.added.insert(path.clone());
        }
    }
    relative.sort();

    let mut unclaimed: BTreeSet<&str> = snapshot.keys().collect();
    let mut matches: Vec<(&PathBuf, &str)> = Vec::new();
    let mut pending: Vec<(&str, &PathBuf)> = Vec::new();

    for (rel, path) in &relative {
        if unclaimed.remove(rel.as_str()) {
            matches.push((*path, rel.as_str()));
        } else {
            pending.push((rel.as_str(), *path));
        }
    }

    for (rel, path) in pending {
        match match_key(rel, &unclaimed) {
            Some(key) => {
                debug!("{rel} matched snapshot key {key} by suffix");
                unclaimed.remove(key);
                matches.push((path, key));
            }
            None => {
                debug!("{rel} is new");
                result.added.insert(path.clone());
            }
        }
    }

    for (path, key) in matches {
        if has_changed(path, snapshot.stamp(key), &stamp_of) {
            debug!("{} is modified (key {key})", path.display());
            result.modified.insert(path.clone());
        }
    }

    result.deleted = unclaimed.into_iter().map(str::to_string).collect();

    result
}

fn has_changed<F>(path: &Path, recorded: Option<MinuteStamp>, stamp_of: &F) -> bool
where
    F: Fn(&Path) -> std::io::Result<MinuteStamp>,
{
    let Some(recorded) = recorded else {
        return true;
    };
    match stamp_of(path) {
        Ok(current) => current != recorded,
        Err(e) => {
            debug!("Cannot read mtime of {}: {e}", path.display());
            true
        }
    }
}

/// Minute-truncated modification time of `path`.
pub fn current_stamp(path: &Path) -> std::io::Result<MinuteStamp> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(MinuteStamp::from_system_time(modified))
}

/// Leading symbols for each summary line. Chosen by the caller so that
/// terminal capabilities never leak into the reconciler.
#[derive(Debug, Clone, Copy)]
pub struct SummarySymbols {
    pub modified: &'static str,
    pub added: &'static str,
    pub deleted: &'static str,
    pub clean: &'static str,
}

impl SummarySymbols {
    pub const EMOJI: SummarySymbols = SummarySymbols {
        modified: "✏️ ",
        added: "➕",
        deleted: "❌",
        clean: "✅",
    };

    pub const PLAIN: SummarySymbols = SummarySymbols {
        modified: "[M]",
        added: "[A]",
        deleted: "[D]",
        clean: "[=]",
    };
}

/// Short advisory digest of a delta: one line per non-empty category with up
/// to five basenames in alphabetical order.
pub fn format_summary(delta: &DeltaResult, symbols: &SummarySymbols) -> String {
    let mut lines = Vec::new();

    let modified = delta.modified.iter().map(|p| path_basename(p));
    let added = delta.added.iter().map(|p| path_basename(p));
    let deleted = delta.deleted.iter().map(|k| key_basename(k).to_string());

    push_summary_line(&mut lines, symbols.modified, "Modified", modified);
    push_summary_line(&mut lines, symbols.added, "Added", added);
    push_summary_line(&mut lines, symbols.deleted, "Deleted", deleted);

    if lines.is_empty() {
        lines.push(format!(
            "> {} No changes detected since last snapshot",
            symbols.clean
        ));
    }
    lines.join("\n")
}

fn push_summary_line<I>(lines: &mut Vec<String>, symbol: &str, label: &str, names: I)
where
    I: Iterator<Item = String>,
{
    let mut names: Vec<String> = names.collect();
    if names.is_empty() {
        return;
    }
    names.sort();

    let count = names.len();
    let mut shown = names
        .iter()
        .take(SUMMARY_NAME_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if count > SUMMARY_NAME_LIMIT {
        shown.push_str(&format!(", ... (+{})", count - SUMMARY_NAME_LIMIT));
    }
    lines.push(format!("> {symbol} {label} ({count}): {shown}"));
}

fn path_basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn key_basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
