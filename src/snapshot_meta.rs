//! The hidden metadata record embedded at the end of a snapshot document.
//!
//! A snapshot document is free-form Markdown, so the machine-readable part
//! lives in an HTML comment that renderers hide:
//!
//! ```text
//! <!-- SNAPSHOT_METADATA
//! {"version": "0.1.0", "generated_at": "2026-02-17 10:00:00", "files": {"src/main.rs": "2026-02-17 09:58"}}
//! -->
//! ```
//!
//! Decoding is fail-open: a missing or unparseable block yields `None` and
//! callers decide what "no baseline" means for them.

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

pub const METADATA_START: &str = "<!-- SNAPSHOT_METADATA";
pub const METADATA_END: &str = "-->";

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A modification time truncated to minute resolution.
///
/// Seconds are dropped on construction so that filesystem timestamp jitter
/// (copies, checkouts, coarse FAT clocks) does not register as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinuteStamp(NaiveDateTime);

impl MinuteStamp {
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M";

    pub fn from_naive(datetime: NaiveDateTime) -> Self {
        let truncated = datetime
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(datetime);
        MinuteStamp(truncated)
    }

    /// Converts a filesystem time using the local timezone.
    pub fn from_system_time(time: SystemTime) -> Self {
        let local: DateTime<Local> = time.into();
        Self::from_naive(local.naive_local())
    }

    /// Parses the recorded form. A seconds component is accepted and dropped,
    /// which tolerates hand-edited documents.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, Self::FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
            .ok()
            .map(Self::from_naive)
    }
}

impl fmt::Display for MinuteStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    version: String,
    #[serde(default)]
    generated_at: String,
    files: serde_json::Map<String, serde_json::Value>,
}

/// What was in a snapshot: snapshot-relative POSIX paths mapped to their
/// recorded modification time, in the order they were recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMetadata {
    version: String,
    generated_at: String,
    /// Insertion-ordered (`preserve_order`). The recorded stamp is kept as a
    /// string so that an unparseable value still identifies a file for
    /// rebuilding.
    files: serde_json::Map<String, serde_json::Value>,
}

impl SnapshotMetadata {
    pub fn new<I>(generated_at: NaiveDateTime, files: I) -> Self
    where
        I: IntoIterator<Item = (String, MinuteStamp)>,
    {
        Self::from_recorded(
            env!("CARGO_PKG_VERSION").to_string(),
            generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            files
                .into_iter()
                .map(|(key, stamp)| (key, stamp.to_string())),
        )
    }

    fn from_recorded<I>(version: String, generated_at: String, files: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut metadata = SnapshotMetadata {
            version,
            generated_at,
            files: serde_json::Map::new(),
        };
        for (key, stamp) in files {
            if metadata.contains_key(&key) {
                debug!("Ignoring duplicate metadata key {key}");
                continue;
            }
            metadata.files.insert(key, serde_json::Value::String(stamp));
        }
        metadata
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn generated_at(&self) -> &str {
        &self.generated_at
    }

    /// Keys in recorded order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    /// The recorded stamp for `key`, or `None` if the key is unknown or its
    /// value does not parse.
    pub fn stamp(&self, key: &str) -> Option<MinuteStamp> {
        self.files
            .get(key)
            .and_then(serde_json::Value::as_str)
            .and_then(MinuteStamp::parse)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Renders the comment block appended to the end of a document.
    pub fn encode(&self) -> Result<String, MetadataError> {
        let raw = RawMetadata {
            version: self.version.clone(),
            generated_at: self.generated_at.clone(),
            files: self.files.clone(),
        };
        // "-->" can only occur inside JSON strings, where > is equivalent.
        let json = serde_json::to_string(&raw)?.replace("-->", "--\\u003e");
        Ok(format!("{METADATA_START}\n{json}\n{METADATA_END}\n"))
    }

    /// Extracts the metadata block from document text.
    ///
    /// The last marker wins, so file contents that merely quote the marker
    /// cannot shadow the real block at the end of the document.
    pub fn decode(document: &str) -> Option<Self> {
        let start = document.rfind(METADATA_START)? + METADATA_START.len();
        let rest = &document[start..];
        let end = rest.find(METADATA_END)?;
        let payload = rest[..end].trim();

        let raw: RawMetadata = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Ignoring unparseable snapshot metadata: {e}");
                return None;
            }
        };

        let files = raw.files.into_iter().map(|(key, value)| {
            let stamp = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, stamp)
        });

        Some(Self::from_recorded(raw.version, raw.generated_at, files))
    }

    /// Reads `path` and decodes its metadata. An unreadable document counts
    /// as one without metadata.
    pub fn decode_file(path: &Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(document) => Self::decode(&document),
            Err(e) => {
                debug!("Could not read snapshot {}: {e}", path.display());
                None
            }
        }
    }
}
