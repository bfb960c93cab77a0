use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "codebase.md";
pub const DEFAULT_MAX_FILE_SIZE_MB: f64 = 10.0;
pub const DEFAULT_TRUNCATION_LIMIT_LINES: usize = 500;

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "__pycache__",
    ".pyc",
    ".pyo",
    ".pyd",
    ".so",
    ".dll",
    ".dylib",
    ".egg-info",
    ".eggs",
    "dist",
    "build",
    ".git",
    ".svn",
    ".hg",
    ".venv",
    "venv",
    "env",
    "node_modules",
    ".idea",
    ".vscode",
    ".DS_Store",
    "Thumbs.db",
    "target",
];

/// Names checked, in order, for a directory's README. The first one present
/// is used as context for that directory.
pub const README_FILENAMES: &[&str] = &[
    "README.md",
    "README.MD",
    "README.rst",
    "README.txt",
    "README",
    "readme.md",
    "Readme.md",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("No path specified")]
    NoPaths,
    #[error("No extensions specified (use --ext, e.g. --ext rs toml Dockerfile)")]
    NoExtensions,
    #[error("Maximum file size must be positive, got {0}")]
    InvalidMaxSize(f64),
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_true() -> bool {
    true
}

fn default_max_file_size_mb() -> f64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

fn default_truncation_limit_lines() -> usize {
    DEFAULT_TRUNCATION_LIMIT_LINES
}

/// Settings for one assembly run, as given on the command line or read
/// from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssembleConfig {
    pub paths: Vec<PathBuf>,
    /// Extensions (`rs`, `.toml`, `env.j2`) and exact file names
    /// (`Dockerfile`).
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default = "default_true")]
    pub use_default_excludes: bool,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: f64,
    #[serde(default = "default_true")]
    pub truncate_large_files: bool,
    #[serde(default = "default_truncation_limit_lines")]
    pub truncation_limit_lines: usize,
    /// Add the README of every walked directory as context, even when its
    /// extension is not selected.
    #[serde(default = "default_true")]
    pub include_readmes: bool,
}

impl AssembleConfig {
    pub fn new(paths: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        AssembleConfig {
            paths,
            extensions,
            exclude_patterns: Vec::new(),
            output: default_output(),
            recursive: true,
            use_default_excludes: true,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            truncate_large_files: true,
            truncation_limit_lines: DEFAULT_TRUNCATION_LIMIT_LINES,
            include_readmes: true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.is_empty() {
            return Err(ConfigError::NoPaths);
        }
        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(ConfigError::NoExtensions);
        }
        // Written this way so NaN is rejected too.
        if !(self.max_file_size_mb > 0.0) {
            return Err(ConfigError::InvalidMaxSize(self.max_file_size_mb));
        }
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        (self.max_file_size_mb * 1024.0 * 1024.0) as u64
    }

    /// User patterns plus the defaults, if enabled, without duplicates.
    pub fn effective_excludes(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .exclude_patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .collect();
        if self.use_default_excludes {
            for default in DEFAULT_EXCLUDE_PATTERNS {
                if !patterns.iter().any(|p| p == default) {
                    patterns.push(default.to_string());
                }
            }
        }
        patterns
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AssembleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| io_error(e, path))?;
        Self::from_toml(&content)
    }

    /// Writes the configuration atomically (temporary file, fsync, rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        use std::io::Write;

        let content = self.to_toml()?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| io_error(e, parent))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| io_error(e, path))?;
        temp_file.as_file().sync_all().map_err(ConfigError::Io)?;
        temp_file
            .persist(path)
            .map_err(|e| io_error(e.error, path))?;

        Ok(())
    }
}

fn io_error(e: std::io::Error, path: &Path) -> ConfigError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        ConfigError::PermissionDenied(path.to_path_buf())
    } else {
        ConfigError::Io(e)
    }
}

/// How candidate file names are selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameFilter {
    /// Suffixes including the leading dot, e.g. `.rs` or `.env.j2`.
    pub extensions: Vec<String>,
    /// Whole file names, e.g. `Dockerfile`.
    pub exact_names: Vec<String>,
}

impl NameFilter {
    /// Sorts the user's tokens into extensions and exact names:
    ///
    /// * `.py` is an extension as given
    /// * `env.j2` becomes `.env.j2`
    /// * `Dockerfile` (capitalized, no dot) is an exact file name
    /// * `py` becomes `.py`
    pub fn from_tokens(tokens: &[String]) -> Self {
        let mut filter = NameFilter::default();
        for token in tokens {
            let token = token.trim();
            let Some(first) = token.chars().next() else {
                continue;
            };
            if token.starts_with('.') {
                filter.extensions.push(token.to_string());
            } else if token.contains('.') {
                filter.extensions.push(format!(".{token}"));
            } else if first.is_uppercase() {
                filter.exact_names.push(token.to_string());
            } else {
                filter.extensions.push(format!(".{token}"));
            }
        }
        filter
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.exact_names.iter().any(|name| name == file_name)
            || self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_token_normalization() {
        let filter = NameFilter::from_tokens(&tokens(&[
            ".py", "rs", "env.j2", "Dockerfile", "Makefile", "", "  toml ",
        ]));
        assert_eq!(
            filter.extensions,
            tokens(&[".py", ".rs", ".env.j2", ".toml"])
        );
        assert_eq!(filter.exact_names, tokens(&["Dockerfile", "Makefile"]));
    }

    #[test]
    fn test_name_filter_matches() {
        let filter = NameFilter::from_tokens(&tokens(&["rs", "Dockerfile"]));
        assert!(filter.matches("main.rs"));
        assert!(filter.matches("Dockerfile"));
        assert!(!filter.matches("Dockerfile.dev"));
        assert!(!filter.matches("main.rsx"));
    }

    #[test]
    fn test_validate() {
        let config = AssembleConfig::new(vec![PathBuf::from(".")], tokens(&["rs"]));
        assert!(config.validate().is_ok());

        let no_paths = AssembleConfig::new(vec![], tokens(&["rs"]));
        assert!(matches!(no_paths.validate(), Err(ConfigError::NoPaths)));

        let no_ext = AssembleConfig::new(vec![PathBuf::from(".")], vec![]);
        assert!(matches!(no_ext.validate(), Err(ConfigError::NoExtensions)));

        let mut bad_size = config.clone();
        bad_size.max_file_size_mb = 0.0;
        assert!(matches!(
            bad_size.validate(),
            Err(ConfigError::InvalidMaxSize(_))
        ));
        bad_size.max_file_size_mb = f64::NAN;
        assert!(bad_size.validate().is_err());
    }

    #[test]
    fn test_effective_excludes() {
        let mut config = AssembleConfig::new(vec![PathBuf::from(".")], tokens(&["rs"]));
        config.exclude_patterns = tokens(&["fixtures", "target"]);

        let patterns = config.effective_excludes();
        assert_eq!(patterns[0], "fixtures");
        assert_eq!(patterns.iter().filter(|p| *p == "target").count(), 1);
        assert!(patterns.iter().any(|p| p == "node_modules"));

        config.use_default_excludes = false;
        assert_eq!(config.effective_excludes(), tokens(&["fixtures", "target"]));
    }

    #[test]
    fn test_toml_defaults() {
        let config = AssembleConfig::from_toml(
            r#"
paths = ["src"]
extensions = ["rs"]
"#,
        )
        .unwrap();
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(config.recursive);
        assert!(config.truncate_large_files);
        assert_eq!(config.max_file_size_mb, DEFAULT_MAX_FILE_SIZE_MB);
        assert_eq!(config.truncation_limit_lines, DEFAULT_TRUNCATION_LIMIT_LINES);
        assert!(config.include_readmes);

        let config = AssembleConfig::from_toml(
            "paths = [\"src\"]\nextensions = [\"rs\"]\ninclude_readmes = false\n",
        )
        .unwrap();
        assert!(!config.include_readmes);
    }

    #[test]
    fn test_toml_rejects_unknown_fields() {
        let result = AssembleConfig::from_toml(
            r#"
paths = ["src"]
extensions = ["rs"]
colour = "blue"
"#,
        );
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_toml_validates() {
        let result = AssembleConfig::from_toml("paths = []\nextensions = [\"rs\"]\n");
        assert!(matches!(result, Err(ConfigError::NoPaths)));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("flatsnap.toml");

        let mut config = AssembleConfig::new(vec![PathBuf::from("src")], tokens(&["rs", "toml"]));
        config.exclude_patterns = tokens(&["fixtures"]);
        config.recursive = false;
        config.max_file_size_mb = 2.5;
        config.include_readmes = false;

        config.save(&path).unwrap();
        let loaded = AssembleConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AssembleConfig::load(Path::new("/nonexistent/flatsnap.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
