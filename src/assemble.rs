//! Snapshot assembly: read the selected files, lay them out as one Markdown
//! document, and embed the metadata the next delta or rebuild relies on.

use crate::architecture::ArchitectureOverview;
use crate::block_finder::{TRUNCATION_MARKER, fence_for};
use crate::config::{AssembleConfig, ConfigError};
use crate::delta::{DeltaResult, SummarySymbols, format_summary, reconcile};
use crate::file_list::{FileListError, collect_candidates, collect_readmes};
use crate::language::fence_language;
use crate::path_match::{common_root, relative_key};
use crate::snapshot_meta::{MetadataError, MinuteStamp, SnapshotMetadata};
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bytes inspected for NUL when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8192;
const CHARS_PER_TOKEN: usize = 4;
const TOKEN_WARNING_THRESHOLD: usize = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    FileList(#[from] FileListError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

fn io_error(e: std::io::Error, path: &Path) -> AssembleError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        AssembleError::PermissionDenied(path.to_path_buf())
    } else {
        AssembleError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Binary,
    TooLarge { size_bytes: u64 },
    Unreadable(String),
    /// Another file already produced this snapshot key; only possible for
    /// names that are not valid UTF-8.
    DuplicateKey(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Binary => write!(f, "binary content"),
            SkipReason::TooLarge { size_bytes } => {
                write!(f, "too large: {}", format_size(*size_bytes))
            }
            SkipReason::Unreadable(reason) => write!(f, "unreadable: {reason}"),
            SkipReason::DuplicateKey(key) => {
                write!(f, "snapshot key {key} is already taken by another file")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct AssembleOutcome {
    pub output: PathBuf,
    pub files_emitted: usize,
    pub files_truncated: usize,
    /// READMEs added as context without being snapshot files themselves.
    pub readmes_included: usize,
    pub total_lines: usize,
    pub estimated_tokens: usize,
    pub skipped: Vec<SkippedFile>,
    /// Present when the run was relative to a previous snapshot.
    pub delta: Option<DeltaResult>,
}

#[derive(Debug)]
struct FileBlock {
    key: String,
    path: PathBuf,
    content: String,
    size_bytes: u64,
    lines: usize,
    stamp: MinuteStamp,
    truncated: bool,
}

/// A README shown for orientation. It has no metadata entry, so rebuild
/// never recreates it.
#[derive(Debug)]
struct ReadmeContext {
    label: String,
    language: &'static str,
    content: String,
}

/// Run one assembly and write the document to `config.output`.
///
/// With `since`, only files that are new or modified relative to that
/// snapshot are emitted, and the document opens with a change summary.
/// Keys are always computed against the common root of every candidate,
/// so a delta snapshot uses the same keys a full one would.
pub fn assemble(
    config: &AssembleConfig,
    since: Option<&Path>,
) -> Result<AssembleOutcome, AssembleError> {
    config.validate()?;

    let mut skip = vec![config.output.clone()];
    skip.extend(since.map(Path::to_path_buf));
    let candidates = collect_candidates(config, &skip)?;
    if candidates.is_empty() {
        warn!("No files matched the configured paths and extensions");
    }

    let delta = since.map(|baseline| reconcile(baseline, &candidates));
    let selected = match &delta {
        Some(delta) => delta.working_set(),
        None => candidates.clone(),
    };

    let root = common_root(candidates.iter().map(PathBuf::as_path))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();

    let mut blocks = Vec::new();
    let mut skipped = Vec::new();
    let mut taken_keys = HashSet::new();
    for path in &selected {
        let key = relative_key(&root, path);
        if !taken_keys.insert(key.clone()) {
            let reason = SkipReason::DuplicateKey(key);
            warn!("Skipped {}: {reason}", path.display());
            skipped.push(SkippedFile {
                path: path.clone(),
                reason,
            });
            continue;
        }
        match read_block(path, key, config) {
            Ok(block) => {
                debug!("Read {} ({} lines)", block.key, block.lines);
                blocks.push(block);
            }
            Err(reason) => {
                warn!("Skipped {}: {reason}", path.display());
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason,
                });
            }
        }
    }
    blocks.sort_by(|a, b| a.key.cmp(&b.key));

    // A README that is a candidate is either a block already or unchanged
    // since the baseline.
    let readmes: Vec<ReadmeContext> = if config.include_readmes {
        let paths: Vec<PathBuf> = collect_readmes(config, &skip)?
            .into_iter()
            .filter(|path| !candidates.contains(path))
            .collect();
        // READMEs may sit above every candidate.
        let label_root = common_root(candidates.iter().chain(&paths).map(PathBuf::as_path))
            .unwrap_or_else(|| root.clone());
        paths
            .iter()
            .filter_map(|path| read_context(path, &label_root, config))
            .collect()
    } else {
        Vec::new()
    };

    let generated_at = Local::now().naive_local();
    let metadata = SnapshotMetadata::new(
        generated_at,
        blocks.iter().map(|block| (block.key.clone(), block.stamp)),
    );
    let banner = delta
        .as_ref()
        .map(|delta| format_summary(delta, &SummarySymbols::EMOJI));

    let rendered = render_document(
        &blocks,
        &readmes,
        skipped.len(),
        banner.as_deref(),
        generated_at,
    );
    let document = format!("{}\n{}", rendered.text, metadata.encode()?);

    write_document(&config.output, &document)?;

    let outcome = AssembleOutcome {
        output: config.output.clone(),
        files_emitted: blocks.len(),
        files_truncated: blocks.iter().filter(|block| block.truncated).count(),
        readmes_included: readmes.len(),
        total_lines: rendered.total_lines,
        estimated_tokens: rendered.estimated_tokens,
        skipped,
        delta,
    };

    info!(
        "Wrote {} files ({} lines, ~{} tokens) to {}",
        outcome.files_emitted,
        group_thousands(outcome.total_lines),
        group_thousands(outcome.estimated_tokens),
        outcome.output.display()
    );
    if outcome.estimated_tokens > TOKEN_WARNING_THRESHOLD {
        warn!(
            "High token volume (~{}); check the context limit of the model you feed this to",
            group_thousands(outcome.estimated_tokens)
        );
    }

    Ok(outcome)
}

fn read_block(path: &Path, key: String, config: &AssembleConfig) -> Result<FileBlock, SkipReason> {
    let unreadable = |e: std::io::Error| SkipReason::Unreadable(e.to_string());

    let metadata = std::fs::metadata(path).map_err(unreadable)?;
    let size_bytes = metadata.len();
    let stamp = MinuteStamp::from_system_time(metadata.modified().map_err(unreadable)?);

    let truncated = size_bytes > config.max_file_size_bytes();
    if truncated && !config.truncate_large_files {
        return Err(SkipReason::TooLarge { size_bytes });
    }

    let bytes = if truncated {
        read_head(path, config.truncation_limit_lines).map_err(unreadable)?
    } else {
        std::fs::read(path).map_err(unreadable)?
    };
    if bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0) {
        return Err(SkipReason::Binary);
    }

    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    if truncated {
        let head_len = content.trim_end_matches('\n').len();
        content.truncate(head_len);
        content.push_str(&truncation_sentinel(config));
    }

    Ok(FileBlock {
        key,
        path: path.to_path_buf(),
        lines: content.lines().count(),
        content,
        size_bytes,
        stamp,
        truncated,
    })
}

fn read_context(path: &Path, root: &Path, config: &AssembleConfig) -> Option<ReadmeContext> {
    let bytes = match std::fs::metadata(path) {
        Ok(metadata) if metadata.len() > config.max_file_size_bytes() => {
            debug!("README {} is too large to add as context", path.display());
            return None;
        }
        Ok(_) => std::fs::read(path),
        Err(e) => Err(e),
    };
    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot read README {}: {e}", path.display());
            return None;
        }
    };
    if bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0) {
        debug!("README {} looks binary", path.display());
        return None;
    }

    Some(ReadmeContext {
        label: relative_key(root, path),
        language: fence_language(path),
        content: String::from_utf8_lossy(&bytes).trim_end().to_string(),
    })
}

fn read_head(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut head = Vec::new();
    for _ in 0..limit {
        if reader.read_until(b'\n', &mut head)? == 0 {
            break;
        }
    }
    Ok(head)
}

fn truncation_sentinel(config: &AssembleConfig) -> String {
    format!(
        "\n\n# ... {TRUNCATION_MARKER} ...\n# Content truncated because > {}MB.\n# Only the first {} lines are shown for context.",
        config.max_file_size_mb, config.truncation_limit_lines
    )
}

struct RenderedDocument {
    text: String,
    total_lines: usize,
    estimated_tokens: usize,
}

fn render_document(
    blocks: &[FileBlock],
    readmes: &[ReadmeContext],
    skipped: usize,
    banner: Option<&str>,
    generated_at: NaiveDateTime,
) -> RenderedDocument {
    let overview = ArchitectureOverview::analyze(blocks.iter().map(|block| block.key.as_str()));

    // Headings here never quote a path in backticks, so they cannot be
    // mistaken for file blocks.
    let mut context = String::new();
    if !readmes.is_empty() {
        context.push_str("## Project Context\n\n");
        for readme in readmes {
            let fence = fence_for(&readme.content);
            context.push_str(&format!(
                "### From {}\n\n{fence}{}\n{}\n{fence}\n\n",
                readme.label, readme.language, readme.content
            ));
        }
    }

    let mut body = String::new();
    for block in blocks {
        let fence = fence_for(&block.content);
        body.push_str(&format!(
            "## `{}` ({}, {} lines)\n\n{fence}{}\n{}\n{fence}\n\n",
            block.key,
            format_size(block.size_bytes),
            group_thousands(block.lines),
            fence_language(&block.path),
            block.content,
        ));
    }

    let total_lines: usize = blocks.iter().map(|block| block.lines).sum();
    let total_bytes: u64 = blocks.iter().map(|block| block.size_bytes).sum();
    let estimated_tokens = (context.chars().count() + body.chars().count()) / CHARS_PER_TOKEN;
    let largest = blocks.iter().fold(None::<&FileBlock>, |largest, block| match largest {
        Some(current) if current.size_bytes >= block.size_bytes => Some(current),
        _ => Some(block),
    });

    let mut text = String::new();
    text.push_str("# Codebase Snapshot\n\n");
    text.push_str(&format!(
        "Generated {} by flatsnap {}.\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        env!("CARGO_PKG_VERSION")
    ));

    if let Some(banner) = banner {
        text.push_str("## Changes Since Last Snapshot\n\n");
        text.push_str(banner);
        text.push_str("\n\n");
    }

    text.push_str("## Statistics\n\n| Metric | Value |\n|---|---|\n");
    text.push_str(&format!("| Files | {} |\n", group_thousands(blocks.len())));
    text.push_str(&format!("| Lines | {} |\n", group_thousands(total_lines)));
    text.push_str(&format!("| Size | {} |\n", format_size(total_bytes)));
    text.push_str(&format!(
        "| Estimated tokens | ~{} |\n",
        group_thousands(estimated_tokens)
    ));
    match largest {
        Some(block) => text.push_str(&format!(
            "| Largest file | `{}` ({}) |\n",
            block.key,
            format_size(block.size_bytes)
        )),
        None => text.push_str("| Largest file | N/A |\n"),
    }
    text.push_str(&format!("| Max depth | {} |\n", overview.max_depth));
    text.push_str(&format!("| Skipped files | {} |\n\n", skipped));

    text.push_str(&overview.to_markdown());
    text.push_str(&context);

    if !blocks.is_empty() {
        text.push_str("## Table of Contents\n\n");
        for block in blocks {
            text.push_str(&format!(
                "- `{}` ({} lines)\n",
                block.key,
                group_thousands(block.lines)
            ));
        }
        text.push('\n');
    }

    text.push_str(&body);

    RenderedDocument {
        text,
        total_lines,
        estimated_tokens,
    }
}

fn write_document(output: &Path, document: &str) -> Result<(), AssembleError> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| io_error(e, parent))?;

    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| io_error(e, parent))?;
    temp_file
        .write_all(document.as_bytes())
        .map_err(|e| io_error(e, output))?;
    temp_file.as_file().sync_all().map_err(AssembleError::Io)?;
    temp_file
        .persist(output)
        .map_err(|e| io_error(e.error, output))?;

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / MB)
    }
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
