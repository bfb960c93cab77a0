//! Locating a file's content inside a snapshot document.
//!
//! A file block is a heading line that contains the backtick-quoted key,
//! followed (not necessarily immediately) by a fenced code block:
//!
//! ````text
//! ## `src/main.rs` (1.2 KB, 40 lines)
//!
//! ```rust
//! fn main() {}
//! ```
//! ````
//!
//! The content is everything between the fences, minus the single newline
//! that precedes the closing fence. When the opening fence line ends in
//! `\r\n` (a document saved by an editor with CRLF line endings), that
//! newline is `\r\n` as well.

use regex::Regex;
use tracing::debug;

/// Sentinel the assembler writes into content it cut short.
pub const TRUNCATION_MARKER: &str = "[TRUNCATED]";

pub trait BlockFinder {
    /// Content recorded for `key`, or `None` when the document has no block
    /// for it.
    fn find_block(&self, document: &str, key: &str) -> Option<String>;
}

/// Finds Markdown fenced blocks using backtick fences of three or more.
///
/// The closing fence must be at least as long as the opening one, so a
/// block opened with four backticks may contain lines starting with three.
#[derive(Debug, Default, Clone, Copy)]
pub struct FencedBlockFinder;

impl BlockFinder for FencedBlockFinder {
    fn find_block(&self, document: &str, key: &str) -> Option<String> {
        let header = header_pattern(key)?;

        // Headings inside another file's fenced content are not headings.
        let mut open_fence: Option<usize> = None;
        let mut crlf = false;
        let mut header_seen = false;
        let mut content_start = 0;
        let mut offset = 0;

        for line in document.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();

            match open_fence {
                Some(fence_len) => {
                    if !is_closing_fence(line, fence_len) {
                        continue;
                    }
                    open_fence = None;
                    if header_seen {
                        let content = &document[content_start..line_start];
                        let newline = if crlf { "\r\n" } else { "\n" };
                        let content = content.strip_suffix(newline).unwrap_or(content);
                        return Some(content.to_string());
                    }
                }
                None => {
                    if let Some(fence_len) = opening_fence(line) {
                        open_fence = Some(fence_len);
                        crlf = line.ends_with("\r\n");
                        content_start = offset;
                    } else if !header_seen && header.is_match(line.trim_end_matches(['\n', '\r'])) {
                        header_seen = true;
                    }
                }
            }
        }

        if header_seen {
            debug!("Block for {key} has no closing fence");
        }
        None
    }
}

fn header_pattern(key: &str) -> Option<Regex> {
    let pattern = format!(r"^#+[ \t].*`{}`.*$", regex::escape(key));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("Cannot build header pattern for {key}: {e}");
            None
        }
    }
}

fn backtick_run(line: &str) -> usize {
    line.chars().take_while(|c| *c == '`').count()
}

fn opening_fence(line: &str) -> Option<usize> {
    let len = backtick_run(line);
    if len < 3 {
        return None;
    }
    // An info string may not contain backticks.
    if line[len..].contains('`') {
        return None;
    }
    Some(len)
}

fn is_closing_fence(line: &str, fence_len: usize) -> bool {
    let line = line.trim_end_matches(['\n', '\r']).trim_end();
    let len = backtick_run(line);
    len >= fence_len && len == line.len()
}

/// The shortest fence that no line of `content` can close early: three
/// backticks, or one more than the longest backtick run that starts a line.
pub fn fence_for(content: &str) -> String {
    let longest = content.lines().map(backtick_run).max().unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(document: &str, key: &str) -> Option<String> {
        FencedBlockFinder.find_block(document, key)
    }

    #[test]
    fn test_finds_block_after_header() {
        let document = "# Codebase\n\n## `src/main.py` (14 B, 1 lines)\n\n```python\nprint('hello')\n```\n";
        assert_eq!(find(document, "src/main.py").as_deref(), Some("print('hello')"));
    }

    #[test]
    fn test_header_must_quote_exact_key() {
        let document = "## `src/a/main.py`\n```python\nA\n```\n## `a/main.py`\n```python\nB\n```\n";
        assert_eq!(find(document, "a/main.py").as_deref(), Some("B"));
        assert_eq!(find(document, "src/a/main.py").as_deref(), Some("A"));
    }

    #[test]
    fn test_key_mentioned_outside_header_is_ignored() {
        let document = "- `a.txt` in the table of contents\n\n## `a.txt`\n```text\nreal\n```\n";
        assert_eq!(find(document, "a.txt").as_deref(), Some("real"));
    }

    #[test]
    fn test_missing_block() {
        assert_eq!(find("# nothing here\n", "a.txt"), None);
    }

    #[test]
    fn test_unclosed_block() {
        assert_eq!(find("## `a.txt`\n```text\nnever closed\n", "a.txt"), None);
    }

    #[test]
    fn test_header_without_block() {
        assert_eq!(find("## `a.txt`\n\nplain text\n", "a.txt"), None);
    }

    #[test]
    fn test_trailing_newline_is_preserved() {
        let document = "## `a.txt`\n```text\nline\n\n```\n";
        assert_eq!(find(document, "a.txt").as_deref(), Some("line\n"));
    }

    #[test]
    fn test_crlf_document() {
        let document = "## `a.txt`\r\n\r\n```text\r\nline1\r\nline2\r\n```\r\n";
        assert_eq!(find(document, "a.txt").as_deref(), Some("line1\r\nline2"));

        let document = "## `a.txt`\r\n```text\r\nline\r\n\r\n```\r\n";
        assert_eq!(find(document, "a.txt").as_deref(), Some("line\r\n"));
    }

    #[test]
    fn test_crlf_content_in_lf_document() {
        let document = "## `a.txt`\n```text\nline1\r\nline2\r\n\n```\n";
        assert_eq!(find(document, "a.txt").as_deref(), Some("line1\r\nline2\r\n"));
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(find("## `a.txt`\n```text\n\n```\n", "a.txt").as_deref(), Some(""));
        assert_eq!(find("## `a.txt`\n```text\n```\n", "a.txt").as_deref(), Some(""));
    }

    #[test]
    fn test_longer_fence_contains_inner_fences() {
        let document = "## `README.md`\n````markdown\nUsage:\n```sh\nrun\n```\n````\n";
        assert_eq!(
            find(document, "README.md").as_deref(),
            Some("Usage:\n```sh\nrun\n```")
        );
    }

    #[test]
    fn test_regex_metacharacters_in_key() {
        let document = "## `lib/a+b (1).rs`\n```rust\nx\n```\n";
        assert_eq!(find(document, "lib/a+b (1).rs").as_deref(), Some("x"));
        assert_eq!(find(document, "lib/aab (1).rs"), None);
    }

    #[test]
    fn test_header_quoted_inside_content_is_ignored() {
        let document = "## `README.md`\n````markdown\n## `src/main.rs`\n```rust\nfake\n```\n````\n\n## `src/main.rs`\n```rust\nreal\n```\n";
        assert_eq!(find(document, "src/main.rs").as_deref(), Some("real"));
    }

    #[test]
    fn test_fence_for_content() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("```sh\nx\n```"), "````");
        assert_eq!(fence_for("`````\n"), "``````");
        assert_eq!(fence_for("inline ``` is fine"), "```");
    }
}
