use crate::block_finder::{BlockFinder, FencedBlockFinder, TRUNCATION_MARKER};
use crate::snapshot_meta::SnapshotMetadata;
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum RebuildError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("{0} resolves outside the output directory")]
    OutsideRoot(PathBuf),
}

/// Something the caller should hear about. Only `Truncated` is a plain
/// warning; every other variant means a file was not rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    MissingMetadata,
    ContentNotFound(String),
    UnsafePath(String),
    Truncated(String),
    WriteFailed { key: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingMetadata => write!(
                f,
                "No valid metadata found in the snapshot document. Rebuild impossible."
            ),
            Diagnostic::ContentNotFound(key) => write!(f, "Content not found for `{key}`"),
            Diagnostic::UnsafePath(key) => write!(
                f,
                "Security skip (path would escape the output directory): {key}"
            ),
            Diagnostic::Truncated(key) => write!(
                f,
                "{key} was truncated in the snapshot; the rebuilt file is a partial copy"
            ),
            Diagnostic::WriteFailed { key, reason } => {
                write!(f, "Failed to write {key}: {reason}")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RebuildOptions {
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Files written, or that would have been written in a dry run.
    pub files_written: usize,
    /// Number of files the snapshot metadata lists.
    pub files_requested: usize,
    /// Destination of every processed file, in metadata order.
    pub targets: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RebuildReport {
    /// A rebuild without metadata, or one that produced nothing out of a
    /// non-empty snapshot, failed outright. Anything else succeeded,
    /// possibly with warnings.
    pub fn is_failure(&self) -> bool {
        self.diagnostics.contains(&Diagnostic::MissingMetadata)
            || (self.files_requested > 0 && self.files_written == 0)
    }
}

/// Reconstruct the files recorded in a snapshot document under `output_root`.
///
/// # Behavior
///
/// **Metadata is mandatory:** the metadata block is the only record of which
/// files the document holds. Without it nothing is written and the report
/// carries a single [`Diagnostic::MissingMetadata`].
///
/// **Per-file isolation:** each metadata key is handled on its own, in
/// recorded order. A missing block, an unsafe key, or a failed write adds a
/// diagnostic and moves on to the next key.
///
/// **Path safety:** keys that are absolute or contain a `..` segment are
/// rejected before anything touches the filesystem. A directory under the
/// output root that is a symlink leading elsewhere is never written through.
///
/// **Atomic writes:** content goes to a temporary file next to the target
/// and is renamed into place, so a failed write leaves nothing behind.
///
/// **Dry run:** with `options.dry_run`, targets are computed and counted but
/// no directory or file is created.
pub fn rebuild(document_path: &Path, output_root: &Path, options: RebuildOptions) -> RebuildReport {
    rebuild_with(document_path, output_root, options, &FencedBlockFinder)
}

pub fn rebuild_with(
    document_path: &Path,
    output_root: &Path,
    options: RebuildOptions,
    finder: &dyn BlockFinder,
) -> RebuildReport {
    let mut report = RebuildReport::default();

    let document = match std::fs::read_to_string(document_path) {
        Ok(document) => document,
        Err(e) => {
            debug!("Cannot read {}: {e}", document_path.display());
            report.diagnostics.push(Diagnostic::MissingMetadata);
            return report;
        }
    };

    let Some(metadata) = SnapshotMetadata::decode(&document) else {
        report.diagnostics.push(Diagnostic::MissingMetadata);
        return report;
    };
    report.files_requested = metadata.len();
    debug!(
        "Snapshot written by version {} at {}",
        metadata.version(),
        metadata.generated_at()
    );
    if metadata.is_empty() {
        info!("Snapshot records no files");
    }

    for key in metadata.keys() {
        let Some(content) = finder.find_block(&document, key) else {
            report
                .diagnostics
                .push(Diagnostic::ContentNotFound(key.to_string()));
            continue;
        };

        let Some(relative) = safe_relative_path(key) else {
            report.diagnostics.push(Diagnostic::UnsafePath(key.to_string()));
            continue;
        };
        let target = output_root.join(relative);

        if options.dry_run {
            debug!("Would create {}", target.display());
        } else if let Err(e) = write_atomically(output_root, &target, &content) {
            let diagnostic = match e {
                RebuildError::OutsideRoot(_) => Diagnostic::UnsafePath(key.to_string()),
                other => Diagnostic::WriteFailed {
                    key: key.to_string(),
                    reason: other.to_string(),
                },
            };
            report.diagnostics.push(diagnostic);
            continue;
        } else {
            info!("Rebuilt {}", target.display());
        }

        if content.contains(TRUNCATION_MARKER) {
            report.diagnostics.push(Diagnostic::Truncated(key.to_string()));
        }

        report.files_written += 1;
        report.targets.push(target);
    }

    report
}

/// Converts a metadata key into a path that stays inside the output root.
///
/// Both separators are treated as separators so a key recorded on another
/// platform cannot smuggle a `..\..` past the check.
pub fn safe_relative_path(key: &str) -> Option<PathBuf> {
    if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
        return None;
    }

    let bytes = key.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return None;
    }

    let segments: Vec<&str> = key
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.is_empty() || segments.contains(&"..") {
        return None;
    }

    let relative: PathBuf = segments.iter().collect();
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || relative.is_absolute() {
        return None;
    }

    Some(relative)
}

fn write_atomically(output_root: &Path, target: &Path, content: &str) -> Result<(), RebuildError> {
    let parent = target.parent().unwrap_or(output_root);

    std::fs::create_dir_all(output_root).map_err(|e| io_error(e, output_root))?;
    let root = output_root
        .canonicalize()
        .map_err(|e| io_error(e, output_root))?;

    // Nothing may be created through an existing directory link that leads
    // out of the root.
    let existing = parent
        .ancestors()
        .find(|dir| dir.exists())
        .unwrap_or(output_root);
    ensure_inside(&root, existing, target)?;

    std::fs::create_dir_all(parent).map_err(|e| io_error(e, parent))?;
    ensure_inside(&root, parent, target)?;

    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| io_error(e, parent))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| io_error(e, target))?;
    temp_file
        .persist(target)
        .map_err(|e| io_error(e.error, target))?;

    Ok(())
}

fn ensure_inside(root: &Path, dir: &Path, target: &Path) -> Result<(), RebuildError> {
    let resolved = dir.canonicalize().map_err(|e| io_error(e, dir))?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        debug!("{} resolves to {}", dir.display(), resolved.display());
        Err(RebuildError::OutsideRoot(target.to_path_buf()))
    }
}

fn io_error(e: std::io::Error, path: &Path) -> RebuildError {
    if e.kind() == ErrorKind::PermissionDenied {
        RebuildError::PermissionDenied(path.to_path_buf())
    } else {
        RebuildError::Io(e)
    }
}
