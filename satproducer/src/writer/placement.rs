//! Atomic placement of files in their destination directories.

use super::WriteError;
use crate::artifact::ArtifactError;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// How a file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Encoded,
    Linked,
    Copied,
    /// Source and destination were the same path.
    Unchanged,
}

/// Permission bits for new files: `0o666` minus the process umask.
#[cfg(unix)]
pub fn default_mode() -> Option<u32> {
    // SAFETY: umask only swaps the process file mode mask; the original mask
    // is restored immediately.
    let mask = unsafe {
        let mask = libc::umask(0);
        libc::umask(mask);
        mask
    };
    Some(0o666 & !(mask as u32))
}

#[cfg(not(unix))]
pub fn default_mode() -> Option<u32> {
    None
}

#[cfg(unix)]
fn set_mode(file: &File, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => file.set_permissions(fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

fn temp_in(dst: &Path) -> Result<NamedTempFile, WriteError> {
    let dir = match dst.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| WriteError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|source| WriteError::Io {
            path: dir.to_path_buf(),
            source,
        })
}

/// Encode into a private file next to `dst`, then rename it into place.
///
/// The encode is attempted twice before giving up.
pub fn encode_into<F>(dst: &Path, mode: Option<u32>, mut encode: F) -> Result<Placement, WriteError>
where
    F: FnMut(&Path) -> Result<(), ArtifactError>,
{
    let temp = temp_in(dst)?;
    set_mode(temp.as_file(), mode).map_err(|source| WriteError::Io {
        path: temp.path().to_path_buf(),
        source,
    })?;

    if let Err(first) = encode(temp.path()) {
        warn!(path = %dst.display(), error = %first, "Encoding failed, retrying once");
        encode(temp.path()).map_err(|source| WriteError::Encode {
            path: dst.to_path_buf(),
            source,
        })?;
    }

    temp.persist(dst).map_err(|e| WriteError::Io {
        path: dst.to_path_buf(),
        source: e.error,
    })?;
    Ok(Placement::Encoded)
}

/// Hard-link `src` to `dst`, copying when they are on different devices.
///
/// An existing `dst` is replaced in one rename, so readers see either the
/// old file or the new one. Failures are retried `retries` times.
pub fn link_or_copy(src: &Path, dst: &Path, retries: u32) -> Result<Placement, WriteError> {
    if src == dst {
        warn!(path = %src.display(), "Not copying a file over itself");
        return Ok(Placement::Unchanged);
    }
    retrying(retries, || try_link_or_copy(src, dst)).map_err(|source| WriteError::LinkOrCopy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })
}

/// Run `op` until it succeeds, at most `retries + 1` times.
fn retrying<T>(retries: u32, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                attempt += 1;
                debug!(error = %e, attempt, "Retrying link or copy");
            }
            Err(e) => return Err(e),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn try_link_or_copy(src: &Path, dst: &Path) -> io::Result<Placement> {
    fs::create_dir_all(parent_dir(dst))?;
    let linked = match fs::hard_link(src, dst) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => replace_with_link(src, dst),
        other => other,
    };
    match linked {
        Ok(()) => Ok(Placement::Linked),
        Err(e) if is_cross_device(&e) => {
            copy_via_temp(src, dst)?;
            Ok(Placement::Copied)
        }
        Err(e) => Err(e),
    }
}

/// Link `src` under a private name next to `dst`, then rename it over `dst`.
fn replace_with_link(src: &Path, dst: &Path) -> io::Result<()> {
    let temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".link")
        .make_in(parent_dir(dst), |path| fs::hard_link(src, path))?;
    let temp_path = temp.path().to_path_buf();
    temp.persist(dst).map_err(|e| e.error)?;
    // Renaming a link over another link to the same file is a no-op
    if fs::symlink_metadata(&temp_path).is_ok() {
        fs::remove_file(&temp_path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(_e: &io::Error) -> bool {
    true
}

fn copy_via_temp(src: &Path, dst: &Path) -> io::Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(parent_dir(dst))?;
    let mut input = File::open(src)?;
    io::copy(&mut input, temp.as_file_mut())?;
    temp.as_file()
        .set_permissions(fs::metadata(src)?.permissions())?;
    temp.persist(dst).map_err(|e| e.error)?;
    Ok(())
}
