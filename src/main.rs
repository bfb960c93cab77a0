mod architecture;
mod assemble;
mod block_finder;
mod cli;
mod config;
mod delta;
mod file_list;
mod language;
mod path_match;
mod rebuild;
mod snapshot_meta;

use cli::{Cli, Command, LogLevel, SelectionArgs};
use config::{AssembleConfig, DEFAULT_EXCLUDE_PATTERNS};
use delta::SummarySymbols;
use rebuild::RebuildOptions;
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr, stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, info, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct SnapExitCode;

impl SnapExitCode {
    /// Exit code used when `delta` finds changes.
    fn changes_found() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (I/O errors, invalid arguments, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    // Change working directory if -C was specified
    if let Some(directory) = cli.directory
        && let Err(e) = std::env::set_current_dir(&directory)
    {
        error!(
            "Failed to change directory to {}: {}",
            directory.display(),
            e
        );
        return SnapExitCode::any_error();
    }

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Assemble {
            selection,
            output,
            since,
            save_config,
        } => handle_assemble(selection, output, since, save_config),
        Command::Delta { since, selection } => handle_delta(since, selection),
        Command::Rebuild {
            document,
            output_dir,
            dry_run,
        } => handle_rebuild(&document, &output_dir, dry_run),
        Command::Excludes => handle_excludes(),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err}");
            SnapExitCode::any_error()
        }
    }
}

/// Merges a config file (if any) with the command line. Flags given on the
/// command line win over the file.
fn build_config(
    selection: SelectionArgs,
    output: Option<PathBuf>,
) -> anyhow::Result<AssembleConfig> {
    let mut config = match &selection.config {
        Some(path) => AssembleConfig::load(path)?,
        None => AssembleConfig::new(Vec::new(), Vec::new()),
    };

    if !selection.paths.is_empty() {
        config.paths = selection.paths;
    } else if config.paths.is_empty() {
        config.paths = vec![PathBuf::from(".")];
    }
    if !selection.extensions.is_empty() {
        config.extensions = selection.extensions;
    }
    config.exclude_patterns.extend(selection.exclude);
    if let Some(output) = output {
        config.output = output;
    }
    if selection.no_recursive {
        config.recursive = false;
    }
    if selection.no_default_excludes {
        config.use_default_excludes = false;
    }
    if let Some(max_size) = selection.max_size {
        config.max_file_size_mb = max_size;
    }
    if selection.no_truncate {
        config.truncate_large_files = false;
    }
    if selection.no_readmes {
        config.include_readmes = false;
    }

    config.validate()?;
    Ok(config)
}

fn summary_symbols() -> SummarySymbols {
    if stdout().is_terminal() {
        SummarySymbols::EMOJI
    } else {
        SummarySymbols::PLAIN
    }
}

fn handle_assemble(
    selection: SelectionArgs,
    output: Option<PathBuf>,
    since: Option<PathBuf>,
    save_config: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let config = build_config(selection, output)?;

    if let Some(path) = save_config {
        config.save(&path)?;
        info!("Saved configuration to {}", path.display());
    }

    let outcome = assemble::assemble(&config, since.as_deref())?;

    if let Some(delta) = &outcome.delta {
        info!("{}", delta::format_summary(delta, &summary_symbols()));
    }
    if outcome.readmes_included > 0 {
        info!("Added {} READMEs as context", outcome.readmes_included);
    }
    if outcome.files_truncated > 0 {
        info!("Truncated {} large files", outcome.files_truncated);
    }
    if !outcome.skipped.is_empty() {
        info!("Skipped {} files:", outcome.skipped.len());
        for skipped in &outcome.skipped {
            info!("  {} ({})", skipped.path.display(), skipped.reason);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_delta(since: PathBuf, selection: SelectionArgs) -> anyhow::Result<ExitCode> {
    let config = build_config(selection, None)?;
    let candidates = file_list::collect_candidates(&config, &[since.clone()])?;
    let result = delta::reconcile(&since, &candidates);

    if !result.baseline_found {
        warn!(
            "No snapshot metadata found in {}; every file is reported as added",
            since.display()
        );
    }

    for (kind, path) in result.entries() {
        println!("{}  {}", kind.code(), path);
    }

    if result.is_empty() {
        info!("{}", delta::format_summary(&result, &summary_symbols()));
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!("{}", delta::format_summary(&result, &summary_symbols()));

    Ok(SnapExitCode::changes_found())
}

fn handle_rebuild(document: &Path, output_dir: &Path, dry_run: bool) -> anyhow::Result<ExitCode> {
    let report = rebuild::rebuild(document, output_dir, RebuildOptions { dry_run });

    if dry_run {
        for target in &report.targets {
            println!("Would create: {}", target.display());
        }
        info!("DRY RUN - no files were written");
    }

    for diagnostic in &report.diagnostics {
        warn!("{diagnostic}");
    }

    if report.is_failure() {
        anyhow::bail!(
            "Rebuild failed: {} of {} files written",
            report.files_written,
            report.files_requested
        );
    }

    info!(
        "Rebuilt {} of {} files into {}",
        report.files_written,
        report.files_requested,
        output_dir.display()
    );

    Ok(ExitCode::SUCCESS)
}

fn handle_excludes() -> anyhow::Result<ExitCode> {
    for pattern in DEFAULT_EXCLUDE_PATTERNS {
        println!("{pattern}");
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let explicit_level = match (log_level, verbose) {
        (Some(level), _) => Some(level.as_filter()),
        (None, 0) => None,
        (None, 1) => Some("info"),
        (None, _) => Some("debug"),
    };

    let filter = match explicit_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::TRACE | Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::TRACE => writer.write_str("TRACE: ")?,
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::build_config;
    use crate::cli::SelectionArgs;
    use std::path::PathBuf;

    #[test]
    fn build_config_defaults_to_current_directory() {
        let selection = SelectionArgs {
            extensions: vec!["rs".to_string()],
            ..SelectionArgs::default()
        };
        let config = build_config(selection, None).unwrap();
        assert_eq!(config.paths, vec![PathBuf::from(".")]);
        assert!(config.recursive);
    }

    #[test]
    fn build_config_applies_flags() {
        let selection = SelectionArgs {
            paths: vec![PathBuf::from("src")],
            extensions: vec!["py".to_string()],
            exclude: vec!["tests".to_string()],
            no_recursive: true,
            no_default_excludes: true,
            max_size: Some(2.0),
            no_truncate: true,
            no_readmes: true,
            config: None,
        };
        let config = build_config(selection, Some(PathBuf::from("out.md"))).unwrap();
        assert_eq!(config.output, PathBuf::from("out.md"));
        assert_eq!(config.exclude_patterns, vec!["tests".to_string()]);
        assert!(!config.recursive);
        assert!(!config.use_default_excludes);
        assert!(!config.truncate_large_files);
        assert!(!config.include_readmes);
        assert_eq!(config.max_file_size_mb, 2.0);
    }

    #[test]
    fn build_config_requires_extensions() {
        assert!(build_config(SelectionArgs::default(), None).is_err());
    }
}
