//! Atomic whole-file replacement
//!
//! Contents are staged in a temporary file, made durable, then renamed
//! onto the target in one step, so readers of the target see either the
//! old or the new contents.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::debug;
use tempfile::Builder;

const STAGING_PREFIX: &str = "rfs-put";

/// Replace `target` with `contents`, staging through `staging_dir`.
///
/// `staging_dir` must live on the same filesystem as `target`, otherwise
/// the final rename fails with a cross-device error. The staging file is
/// removed on every failure path.
pub fn write_atomic(staging_dir: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
    let mut staged = Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(staging_dir)
        .map_err(without_path)?;

    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    set_final_permissions(staged.as_file())?;

    // Closes the handle; the file itself lives until persisted or dropped.
    let staged = staged.into_temp_path();
    debug!("Staged {} bytes at {}", contents.len(), staged.display());

    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_final_permissions(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn set_final_permissions(file: &File) -> io::Result<()> {
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(false);
    file.set_permissions(permissions)
}

/// tempfile embeds the staging path in its errors; keep only the cause.
fn without_path(error: io::Error) -> io::Error {
    match error.raw_os_error() {
        Some(code) => io::Error::from_raw_os_error(code),
        None => io::Error::from(error.kind()),
    }
}
