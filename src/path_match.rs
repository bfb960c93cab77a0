//! Pairing current files with snapshot keys.
//!
//! A snapshot built from `src/` records `lib/util.rs`, while a later run from
//! the parent directory computes `src/lib/util.rs` for the same file. Exact
//! matching handles the common case; whole-segment suffix matching absorbs
//! that root skew. Both sides of a suffix match must share a basename, so
//! `a/config.py` and `b/config.py` never pair with each other.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Longest shared directory prefix of `paths`.
///
/// If the shared prefix is itself a file (a single candidate, typically), its
/// parent directory is used instead. Returns `None` for an empty input or
/// when the paths share no prefix at all.
pub fn common_root<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let paths: Vec<&Path> = paths.into_iter().collect();
    let first = paths.first()?;
    let mut prefix: Vec<Component<'a>> = first.components().collect();

    for path in &paths[1..] {
        let shared = prefix
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
    }

    if prefix.is_empty() {
        return None;
    }

    let root: PathBuf = prefix.iter().collect();
    // Candidates are files, so a prefix equal to one of them is a file even
    // when it has since vanished from disk.
    if root.is_file() || paths.iter().any(|path| *path == root) {
        return root.parent().map(Path::to_path_buf);
    }
    Some(root)
}

/// Forward-slash path of `path` relative to `root`, without a leading `./`.
///
/// Paths outside `root` keep their own normal components.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

/// Whether one path is a whole-segment suffix of the other and both end in
/// the same basename.
pub fn is_suffix_match(relative: &str, key: &str) -> bool {
    let relative = segments(relative);
    let key = segments(key);

    let (Some(relative_name), Some(key_name)) = (relative.last(), key.last()) else {
        return false;
    };
    if relative_name != key_name {
        return false;
    }

    relative.ends_with(&key) || key.ends_with(&relative)
}

/// Finds the snapshot key for `relative`.
///
/// Exact equality wins. Otherwise the first key in sorted order that passes
/// [`is_suffix_match`] is returned; with several plausible keys the
/// lexicographically smallest one is chosen.
pub fn match_key<'k>(relative: &str, keys: &BTreeSet<&'k str>) -> Option<&'k str> {
    if let Some(exact) = keys.get(relative) {
        return Some(*exact);
    }
    keys.iter()
        .copied()
        .find(|key| is_suffix_match(relative, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn keys<'a>(items: &[&'a str]) -> BTreeSet<&'a str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_exact_match_wins() {
        let snapshot = keys(&["lib/config.py", "src/lib/config.py"]);
        assert_eq!(
            match_key("src/lib/config.py", &snapshot),
            Some("src/lib/config.py")
        );
    }

    #[test]
    fn test_suffix_match_absorbs_root_skew() {
        let snapshot = keys(&["lib/util.rs"]);
        assert_eq!(match_key("src/lib/util.rs", &snapshot), Some("lib/util.rs"));

        let snapshot = keys(&["src/lib/util.rs"]);
        assert_eq!(match_key("lib/util.rs", &snapshot), Some("src/lib/util.rs"));
    }

    #[test]
    fn test_sibling_basenames_never_cross_match() {
        let snapshot = keys(&["a/config.py"]);
        assert_eq!(match_key("b/config.py", &snapshot), None);
    }

    #[test]
    fn test_partial_segment_is_not_a_suffix() {
        assert!(!is_suffix_match("src/foo/config.py", "o/config.py"));
        assert!(!is_suffix_match("myconfig.py", "config.py"));
        assert!(is_suffix_match("src/foo/config.py", "foo/config.py"));
    }

    #[test]
    fn test_ambiguous_suffix_picks_smallest_key() {
        // Both keys end with the bare basename, so either would pair.
        let snapshot = keys(&["b/config.py", "a/config.py"]);
        assert_eq!(match_key("config.py", &snapshot), Some("a/config.py"));
    }

    #[test]
    fn test_empty_paths_do_not_match() {
        assert!(!is_suffix_match("", "a.txt"));
        assert!(!is_suffix_match("a.txt", ""));
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/work/project");
        assert_eq!(
            relative_key(root, Path::new("/work/project/src/main.rs")),
            "src/main.rs"
        );
        assert_eq!(relative_key(root, Path::new("./src/main.rs")), "src/main.rs");
    }

    #[test]
    fn test_common_root_of_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("api")).unwrap();
        fs::create_dir_all(root.join("db")).unwrap();
        fs::write(root.join("api/config.py"), "a").unwrap();
        fs::write(root.join("db/config.py"), "b").unwrap();

        let a = root.join("api/config.py");
        let b = root.join("db/config.py");
        assert_eq!(
            common_root([a.as_path(), b.as_path()]),
            Some(root.to_path_buf())
        );
    }

    #[test]
    fn test_common_root_of_single_file_is_parent() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("only.txt");
        fs::write(&file, "x").unwrap();

        assert_eq!(
            common_root([file.as_path()]),
            Some(temp.path().to_path_buf())
        );
    }

    #[test]
    fn test_common_root_is_component_wise() {
        let a = Path::new("/data/project-one/a.txt");
        let b = Path::new("/data/project-two/b.txt");
        assert_eq!(common_root([a, b]), Some(PathBuf::from("/data")));
    }

    #[test]
    fn test_common_root_empty() {
        assert_eq!(common_root(std::iter::empty::<&Path>()), None);
    }
}
