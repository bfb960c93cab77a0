pub(super) const ROOT_LONG_ABOUT: &str = "\
Flatten a source tree into one Markdown snapshot, and turn snapshots back into files

Flatsnap writes the selected files of a project into a single Markdown document,
suitable for pasting into a language model or attaching to a review. Each snapshot
carries a hidden metadata block recording which files it holds and when they were
last modified, so later runs can report what changed and rebuild the tree.

CORE CONCEPTS:

  Snapshot:
    A Markdown document with one fenced block per file, followed by an HTML comment
    that holds the metadata record:

      <!-- SNAPSHOT_METADATA
      {\"version\": \"0.1.0\", \"generated_at\": \"...\", \"files\": {\"src/main.rs\": \"2026-02-17 09:58\"}}
      -->

  Keys:
    Files are recorded by their path relative to the common root of all selected
    files, with forward slashes. A later run from a parent directory still pairs
    'src/lib/util.rs' with the recorded 'lib/util.rs'.

  Minute resolution:
    Modification times are compared with seconds dropped, so copies and checkouts
    that only jitter the clock do not show up as changes.

TYPICAL WORKFLOW:

  1. Take a full snapshot:
     $ flatsnap assemble src -e rs toml -o codebase.md

  2. Work on the project, then see what changed:
     $ flatsnap delta --since codebase.md src -e rs toml

  3. Snapshot only the changes:
     $ flatsnap assemble src -e rs toml --since codebase.md -o changes.md

  4. Recreate the files elsewhere:
     $ flatsnap rebuild codebase.md -o /tmp/restored

COMMANDS:

  assemble   Write a snapshot document
  delta      List changes relative to a snapshot
  rebuild    Recreate files from a snapshot document
  excludes   Print the default exclude patterns

GLOBAL OPTIONS:

  -C <DIRECTORY>
    Change to directory before operating (like git -C or make -C).
    Relative paths in every other argument are resolved from there.

EXIT CODES:

  0    Success (for delta: no changes)
  1    delta found changes
  255  Any error, including a rebuild that produced nothing

For more information on a specific command, run:
  flatsnap assemble --help
  flatsnap delta --help
  flatsnap rebuild --help
";

pub(super) const ASSEMBLE_LONG_ABOUT: &str = "\
Write a snapshot document

Collects every file under PATHS whose name matches one of the --ext values, and writes
them into a single Markdown document with a statistics table, a table of contents, and
one fenced block per file.

FILE SELECTION:

  --ext accepts extensions with or without the leading dot, compound extensions, and
  exact file names:

    -e rs .toml        matches *.rs and *.toml
    -e env.j2          matches *.env.j2
    -e Dockerfile      matches files named exactly 'Dockerfile'

  A token that starts with a capital letter and contains no dot is a file name.

EXCLUSION:

  --exclude patterns apply to every path segment below the directories being walked:

    -x fixtures        skips any directory or file named 'fixtures' (any case)
    -x .log            skips anything whose name ends in '.log'
    -x src/generated   skips that path and everything beneath it

  A default list (version control, virtual environments, build outputs, caches) is
  added unless --no-default-excludes is given. See 'flatsnap excludes'.

LARGE FILES:

  Files above --max-size megabytes are cut to their first lines and marked with a
  [TRUNCATED] note, or skipped entirely with --no-truncate. Files that look binary
  are always skipped.

CONTEXT AND OVERVIEW:

  The document header carries a statistics table (including the largest file and
  the deepest nesting) and an architecture overview: top-level components, file
  types with their share, naming conventions such as tests or API routes, and the
  depth distribution.

  The README of every walked directory is added under 'Project Context', even when
  its extension is not selected. These READMEs are not snapshot files and are never
  rebuilt. A README that is itself selected appears only once, as a file block.
  Use --no-readmes to leave them out.

DELTA SNAPSHOTS (--since):

  With --since, only files that are new or modified relative to the given snapshot
  are written, and the document opens with a summary of what changed, including
  deletions. Keys stay the same as in a full snapshot.

CONFIGURATION FILES:

  --config reads all settings from a TOML file. --save-config writes the effective
  settings of this run, so the same snapshot can be repeated later:

    paths = [\"src\"]
    extensions = [\"rs\", \"toml\"]
    exclude_patterns = [\"fixtures\"]
    output = \"codebase.md\"
    recursive = true
    use_default_excludes = true
    max_file_size_mb = 10.0
    truncate_large_files = true
    truncation_limit_lines = 500
    include_readmes = true

EXAMPLES:

  # Snapshot a Rust project
  $ flatsnap assemble . -e rs toml md

  # Snapshot only what changed since the last snapshot
  $ flatsnap assemble . -e rs toml md --since codebase.md -o changes.md

  # Save the settings and reuse them
  $ flatsnap assemble src -e py -x tests --save-config flatsnap.toml
  $ flatsnap assemble --config flatsnap.toml
";

pub(super) const DELTA_LONG_ABOUT: &str = "\
List changes relative to a snapshot

Selects files exactly like 'assemble' and compares them against the metadata embedded
in the --since document. Each change is printed on its own line:

  M  /abs/path/to/modified/file
  A  /abs/path/to/new/file
  D  recorded/key/of/deleted/file

followed by a short summary. Deleted files are shown by their recorded key, since they
no longer have a path on disk.

A document without a metadata block is not an error: every file is reported as added.

EXIT STATUS:

  0    No changes
  1    At least one file was modified, added, or deleted
  255  Error

EXAMPLES:

  $ flatsnap delta --since codebase.md src -e rs
  $ flatsnap delta --since codebase.md --config flatsnap.toml
";

pub(super) const REBUILD_LONG_ABOUT: &str = "\
Recreate files from a snapshot document

Reads the metadata block of DOCUMENT and writes every recorded file under the output
directory, creating parent directories as needed. Each file is written to a temporary
file first and renamed into place.

SAFETY:

  Keys that are absolute or contain '..' are refused and reported, so a crafted
  document cannot write outside the output directory.

PARTIAL RESULTS:

  A file whose block cannot be found, or whose write fails, is reported and skipped;
  the rest are still written. Files that were truncated in the snapshot are written
  as they appear and reported, since the copy is incomplete.

  The command fails (exit 255) when the document has no metadata block, or when none
  of the recorded files could be written.

DRY RUN (--dry-run):

  Prints 'Would create: <path>' for every file without touching the filesystem.

EXAMPLES:

  $ flatsnap rebuild codebase.md -o restored
  $ flatsnap rebuild codebase.md --dry-run
";
