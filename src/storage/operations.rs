//! Storage operations
//!
//! Handles the filesystem side of every remote request: directory
//! management, listing, stat, rename, delete, and whole-file read/write.

use log::debug;
use std::fs;
use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::error::{FsError, Operation};
use crate::storage::atomic_write::write_atomic;
use crate::storage::resolver::PathResolver;
use crate::storage::results::FileInfo;

/// Executes path-addressed operations against one root directory.
///
/// Holds only immutable configuration, so clones can serve requests
/// concurrently. Every error carries the caller's relative path(s).
#[derive(Debug, Clone)]
pub struct FileAccessHandler {
    resolver: PathResolver,
    staging_dir: PathBuf,
}

impl FileAccessHandler {
    pub fn new(resolver: PathResolver, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let resolver = PathResolver::new(config.server_root_path()).confined(config.confine_paths);
        Self::new(resolver, config.staging_dir_path())
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Create a single directory.
    pub fn make_directory(&self, path: &str) -> Result<(), FsError> {
        let real_path = self.resolver.resolve_for(Operation::MakeDirectory, path)?;
        fs::create_dir(&real_path).map_err(|e| FsError::at(Operation::MakeDirectory, path, e))?;
        debug!("Created directory {} (real: {})", path, real_path.display());
        Ok(())
    }

    /// Remove an empty directory.
    pub fn remove_directory(&self, path: &str) -> Result<(), FsError> {
        let real_path = self.resolver.resolve_for(Operation::RemoveDirectory, path)?;
        fs::remove_dir(&real_path).map_err(|e| FsError::at(Operation::RemoveDirectory, path, e))?;
        debug!("Removed directory {} (real: {})", path, real_path.display());
        Ok(())
    }

    /// Names of every entry in a directory, in no particular order.
    pub fn list_directory(&self, path: &str) -> Result<Vec<String>, FsError> {
        let real_path = self.resolver.resolve_for(Operation::ListDirectory, path)?;
        let fail = |e| FsError::at(Operation::ListDirectory, path, e);

        // The directory handle is closed when `entries` drops, on every path.
        let entries = fs::read_dir(&real_path).map_err(fail)?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(fail)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        debug!(
            "Listed directory {} (real: {}) - {} entries",
            path,
            real_path.display(),
            names.len()
        );
        Ok(names)
    }

    /// Stat a path, reporting a deleted marker when only the parent exists.
    pub fn stat(&self, path: &str) -> Result<FileInfo, FsError> {
        let real_path = self.resolver.resolve_for(Operation::Stat, path)?;

        if let Ok(metadata) = fs::metadata(&real_path) {
            let name = real_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(FileInfo::from_metadata(name, &metadata));
        }

        let parent = real_path.parent().unwrap_or(self.resolver.root());
        match fs::metadata(parent) {
            Ok(_) => Ok(FileInfo::deleted_marker()),
            Err(e) => Err(FsError::at(Operation::Stat, path, e)),
        }
    }

    /// Atomically rename `old` to `new`.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        let (real_old, real_new) = self.resolver.resolve_pair(Operation::Rename, old, new)?;
        fs::rename(&real_old, &real_new)
            .map_err(|e| FsError::between(Operation::Rename, old, new, e))?;
        debug!("Renamed {} -> {}", old, new);
        Ok(())
    }

    /// Remove a file.
    pub fn delete(&self, path: &str) -> Result<(), FsError> {
        let real_path = self.resolver.resolve_for(Operation::Delete, path)?;
        fs::remove_file(&real_path).map_err(|e| FsError::at(Operation::Delete, path, e))?;
        debug!("Deleted file {} (real: {})", path, real_path.display());
        Ok(())
    }

    /// Whole contents of a file.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let real_path = self.resolver.resolve_for(Operation::Read, path)?;
        fs::read(&real_path).map_err(|e| FsError::at(Operation::Read, path, e))
    }

    /// Replace a file's contents atomically.
    pub fn write(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let real_path = self.resolver.resolve_for(Operation::Write, path)?;
        write_atomic(&self.staging_dir, &real_path, contents)
            .map_err(|e| FsError::at(Operation::Write, path, e))?;
        debug!(
            "Wrote {} bytes to {} (real: {})",
            contents.len(),
            path,
            real_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashSet;
    use tempfile::TempDir;

    /// Root and staging directory share one temp dir so renames stay local.
    fn setup() -> (TempDir, FileAccessHandler) {
        let base = TempDir::new().expect("create temp dir");
        let root = base.path().join("root");
        let staging = base.path().join("staging");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&staging).unwrap();
        let handler = FileAccessHandler::new(PathResolver::new(root), staging);
        (base, handler)
    }

    fn root_of(handler: &FileAccessHandler) -> String {
        handler.resolver().root().to_string_lossy().into_owned()
    }

    #[test]
    fn example_scenario() {
        let (_base, store) = setup();

        store.make_directory("a").unwrap();
        store.write("a/f.txt", b"hello").unwrap();
        assert_eq!(store.list_directory("a").unwrap(), vec!["f.txt".to_string()]);

        let info = store.stat("a/f.txt").unwrap();
        assert_eq!(info.name, "f.txt");
        assert_eq!(info.size, 5);
        assert!(!info.is_dir);
        assert!(!info.deleted);
        assert!(info.mod_time > 0);

        store.delete("a/f.txt").unwrap();
        assert_eq!(store.stat("a/f.txt").unwrap(), FileInfo::deleted_marker());
    }

    #[test]
    fn stat_on_missing_path_is_stable() {
        let (_base, store) = setup();
        store.make_directory("dir").unwrap();

        for _ in 0..3 {
            let info = store.stat("dir/never-there").unwrap();
            assert!(info.deleted);
            assert_eq!(info.name, "");
            assert_eq!(info.size, 0);
            assert_eq!(info.mod_time, 0);
            assert!(!info.is_dir);
        }
    }

    #[test]
    fn stat_on_unreachable_path_fails() {
        let (_base, store) = setup();
        let err = store.stat("missing/x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("missing/x"));
    }

    #[test]
    fn trailing_slash_still_finds_the_file() {
        let (_base, store) = setup();
        store.write("f.txt", b"hello").unwrap();

        let info = store.stat("f.txt/").unwrap();
        assert!(!info.deleted);
        assert_eq!(info.name, "f.txt");
        assert_eq!(info.size, 5);
        assert_eq!(store.read("/f.txt/").unwrap(), b"hello");
    }

    #[test]
    fn stat_reports_directories() {
        let (_base, store) = setup();
        store.make_directory("sub").unwrap();
        let info = store.stat("/sub").unwrap();
        assert_eq!(info.name, "sub");
        assert!(info.is_dir);
        assert!(!info.deleted);
    }

    #[test]
    fn round_trips_any_bytes() {
        let (_base, store) = setup();
        let binary: Vec<u8> = (0..=255).collect();

        store.write("empty", b"").unwrap();
        store.write("binary", &binary).unwrap();

        assert_eq!(store.read("empty").unwrap(), Vec::<u8>::new());
        assert_eq!(store.read("binary").unwrap(), binary);
    }

    #[test]
    fn rename_moves_attributes() {
        let (_base, store) = setup();
        store.write("old.txt", b"payload").unwrap();
        let before = store.stat("old.txt").unwrap();

        store.rename("old.txt", "new.txt").unwrap();

        assert!(store.stat("old.txt").unwrap().deleted);
        let after = store.stat("new.txt").unwrap();
        assert_eq!(after.name, "new.txt");
        assert_eq!(after.size, before.size);
        assert_eq!(after.mod_time, before.mod_time);
        assert_eq!(after.is_dir, before.is_dir);
    }

    #[test]
    fn rename_error_carries_both_relative_paths() {
        let (_base, store) = setup();
        let err = store.rename("missing/a", "missing/b").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("missing/a -> missing/b"));
        assert!(!text.contains(&root_of(&store)));
        assert_eq!(err.operation(), Operation::Rename);
    }

    #[test]
    fn errors_never_leak_the_root() {
        let (_base, store) = setup();
        let root = root_of(&store);

        let errors = vec![
            store.make_directory("missing/x").unwrap_err(),
            store.remove_directory("missing/x").unwrap_err(),
            store.list_directory("missing/x").unwrap_err(),
            store.delete("missing/x").unwrap_err(),
            store.read("missing/x").unwrap_err(),
            store.write("missing/x", b"data").unwrap_err(),
        ];
        for err in errors {
            let text = err.to_string();
            assert!(text.contains("missing/x"), "{}", text);
            assert!(!text.contains(&root), "{}", text);
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn directory_conflicts_are_classified() {
        let (_base, store) = setup();
        store.make_directory("d").unwrap();
        store.write("d/f", b"x").unwrap();

        assert_eq!(store.make_directory("d").unwrap_err().kind(), ErrorKind::AlreadyExists);
        assert_eq!(store.remove_directory("d").unwrap_err().kind(), ErrorKind::NotEmpty);

        store.delete("d/f").unwrap();
        store.remove_directory("d").unwrap();
        assert!(store.stat("d").unwrap().deleted);
    }

    #[test]
    fn listing_is_complete() {
        let (_base, store) = setup();
        store.make_directory("empty").unwrap();
        store.make_directory("full").unwrap();
        for i in 0..10 {
            store.write(&format!("full/file-{}", i), b"").unwrap();
        }
        store.make_directory("full/nested").unwrap();

        assert!(store.list_directory("empty").unwrap().is_empty());

        let names: HashSet<String> = store.list_directory("full").unwrap().into_iter().collect();
        assert_eq!(names.len(), 11);
        assert!(names.contains("file-0"));
        assert!(names.contains("nested"));
    }

    #[test]
    fn listing_a_file_fails() {
        let (_base, store) = setup();
        store.write("plain", b"x").unwrap();
        let err = store.list_directory("plain").unwrap_err();
        assert_eq!(err.operation(), Operation::ListDirectory);
    }

    #[test]
    fn confined_handler_rejects_escapes() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("root");
        fs::create_dir(&root).unwrap();
        let handler = FileAccessHandler::new(PathResolver::new(&root).confined(true), base.path());

        let err = handler.write("../outside.txt", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutsideRoot);
        assert!(!base.path().join("outside.txt").exists());

        handler.write("inside.txt", b"x").unwrap();
        let err = handler.rename("inside.txt", "../outside.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutsideRoot);
        assert!(err.to_string().contains("inside.txt -> ../outside.txt"));
        assert!(root.join("inside.txt").exists());
    }

    #[test]
    fn concurrent_reads_never_see_torn_writes() {
        let (_base, store) = setup();
        let old = vec![b'a'; 256 * 1024];
        let new = vec![b'b'; 512 * 1024];
        store.write("big", &old).unwrap();

        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for i in 0..20 {
                    let contents = if i % 2 == 0 { &new } else { &old };
                    store.write("big", contents).unwrap();
                }
            });
            for _ in 0..50 {
                let seen = store.read("big").unwrap();
                assert!(seen == old || seen == new, "torn read of {} bytes", seen.len());
            }
            writer.join().unwrap();
        });
    }
}
