//! Locked-file scan.
//!
//! Walks the run directory probing each file with an open-for-append;
//! files another process still holds open exclusively fail the probe.
//! The scan reports, it never fails the run.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Probe every file under `dir`, returning the paths that could not be
/// opened for append.
pub fn scan_locked(dir: &Path) -> Vec<PathBuf> {
    let mut locked = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        match OpenOptions::new().append(true).open(entry.path()) {
            Ok(_) => {}
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Locked file");
                locked.push(entry.path().to_path_buf());
            }
        }
    }

    locked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writable_files_pass_the_probe() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.txt"), "b").unwrap();

        assert!(scan_locked(dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_files_are_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealed.bin");
        fs::write(&path, "x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        let locked = scan_locked(dir.path());
        // Root bypasses permission bits, so only assert when the probe
        // can actually fail.
        if !locked.is_empty() {
            assert_eq!(locked, vec![path.clone()]);
        }

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn missing_directory_scans_empty() {
        assert!(scan_locked(Path::new("/nonexistent/harvest")).is_empty());
    }
}
