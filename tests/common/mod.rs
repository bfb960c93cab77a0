use assert_cmd::{Command, cargo::cargo_bin_cmd};
use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

// Each integration test file is compiled as its own crate and uses a
// different subset of these helpers.

/// A fixed modification time on a minute boundary, so tests never depend on
/// the wall clock crossing into the next minute.
#[allow(dead_code)]
pub const BASE_MTIME: i64 = 1_700_000_040;

pub fn flatsnap_cmd(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("flatsnap");
    cmd.arg("-C").arg(cwd);
    cmd
}

/// Writes `content` to `root/relative`, creating parents, with the mtime
/// pinned to `BASE_MTIME`.
#[allow(dead_code)]
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("file has a parent")).unwrap();
    fs::write(&path, content).unwrap();
    set_mtime(&path, BASE_MTIME);
    path
}

#[allow(dead_code)]
pub fn set_mtime(path: &Path, unix_seconds: i64) {
    set_file_mtime(path, FileTime::from_unix_time(unix_seconds, 0)).unwrap();
}

/// Runs `flatsnap assemble` in `cwd` and asserts success.
#[allow(dead_code)]
pub fn assemble(cwd: &Path, args: &[&str]) {
    flatsnap_cmd(cwd).arg("assemble").args(args).assert().success();
}

#[allow(dead_code)]
pub fn delta_output(cwd: &Path, args: &[&str]) -> Output {
    let mut cmd = flatsnap_cmd(cwd);
    cmd.arg("delta").args(args);
    cmd.output().expect("failed to run `flatsnap delta`")
}
