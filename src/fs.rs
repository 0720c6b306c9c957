//! Filesystem operations tailored to this crate.
//!
//! Inside this module, we refer to `std::fs` by its fully qualified path to
//! make it maximally clear what we are using.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use color_eyre::Result;
use color_eyre::eyre::Context;
use filetime::{FileTime, set_file_mtime};
use is_executable::IsExecutable;
use tap::TapFallible;
use tracing::{instrument, trace};

use crate::hash::Fingerprint;

/// Copy the file from `src` to `dst`, creating parent directories of `dst`
/// as needed, and return the content hash of what was copied.
///
/// This mirrors the reference toolchain's copy-then-hash helper: callers
/// use the returned hash both to name the cached blob and to verify it on
/// restore.
#[instrument]
pub fn copy_hash_file(
    src: impl AsRef<Path> + std::fmt::Debug,
    dst: impl AsRef<Path> + std::fmt::Debug,
) -> Result<Fingerprint> {
    use blake2::digest::Digest;

    let (src, dst) = (src.as_ref(), dst.as_ref());
    if let Some(parent) = dst.parent() {
        create_dir_all(parent)?;
    }

    let mut src_file = std::fs::File::open(src).with_context(|| format!("open {src:?}"))?;
    let mut dst_file = std::fs::File::create(dst).with_context(|| format!("create {dst:?}"))?;
    let mut hasher = blake2::Blake2b::<blake2::digest::consts::U32>::new();

    let mut buf = [0u8; 64 * 1024];
    let mut bytes = 0u64;
    loop {
        let n = src_file.read(&mut buf).with_context(|| format!("read {src:?}"))?;
        if n == 0 {
            break;
        }
        dst_file
            .write_all(&buf[..n])
            .with_context(|| format!("write {dst:?}"))?;
        hasher.update(&buf[..n]);
        bytes += n as u64;
    }
    dst_file.sync_all().context("sync destination file")?;

    let hash = hex::encode(hasher.finalize());
    trace!(?src, ?dst, ?bytes, ?hash, "copy and hash file");
    Ok(Fingerprint::from_hex(hash))
}

/// Plain byte-for-byte copy, used for cache restores where the destination's
/// mtime is set explicitly by the caller afterwards.
#[instrument]
pub fn copy_file(
    src: impl AsRef<Path> + std::fmt::Debug,
    dst: impl AsRef<Path> + std::fmt::Debug,
) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if let Some(parent) = dst.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(src, dst).with_context(|| format!("copy {src:?} to {dst:?}"))?;
    trace!(?src, ?dst, "copy file");
    Ok(())
}

/// Create the directory and all its parents, if they don't already exist.
#[instrument]
pub fn create_dir_all(dir: impl AsRef<Path> + std::fmt::Debug) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create dir: {dir:?}"))
        .tap_ok(|_| trace!(?dir, "create directory"))
}

/// Buffer the file content from disk.
#[instrument]
pub fn read_buffered(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path)
        .with_context(|| format!("read file: {path:?}"))
        .tap_ok(|buf| trace!(?path, bytes = buf.len(), "read file"))
}

/// Buffer the file content from disk and parse it as UTF8.
#[instrument]
pub fn read_buffered_utf8(path: impl AsRef<Path> + std::fmt::Debug) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .with_context(|| format!("read file: {path:?}"))
        .tap_ok(|buf| trace!(?path, bytes = buf.len(), "read file as string"))
}

/// Write the provided file content to disk, creating parent directories.
#[instrument(skip(content))]
pub fn write(path: impl AsRef<Path> + std::fmt::Debug, content: impl AsRef<[u8]>) -> Result<()> {
    let (path, content) = (path.as_ref(), content.as_ref());
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("write file: {path:?}"))
        .tap_ok(|_| trace!(?path, bytes = content.len(), "write file"))
}

/// Write content to a temporary sibling file, then atomically rename it into
/// place. Used by the cache store so a crash mid-write never leaves a
/// partially-written blob at its final name.
#[instrument(skip(content))]
pub fn write_atomic(
    dir: impl AsRef<Path> + std::fmt::Debug,
    final_name: &str,
    content: impl AsRef<[u8]>,
) -> Result<()> {
    let dir = dir.as_ref();
    create_dir_all(dir)?;
    let tmp = dir.join("file.swp");
    write(&tmp, content)?;
    let dst = dir.join(final_name);
    std::fs::rename(&tmp, &dst).with_context(|| format!("rename {tmp:?} to {dst:?}"))?;
    trace!(?dst, "wrote atomic file");
    Ok(())
}

/// Report whether the path exists.
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Report whether the path is a directory.
pub fn is_dir(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

/// Report whether the path is a regular file.
pub fn is_file(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Report whether the path is a file the current user can execute.
pub fn is_executable(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_executable()
}

/// Get a file's modification time as a `SystemTime`.
#[instrument]
pub fn mtime(path: impl AsRef<Path> + std::fmt::Debug) -> Result<SystemTime> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).with_context(|| format!("stat {path:?}"))?;
    meta.modified().with_context(|| format!("read mtime of {path:?}"))
}

/// Get a file's size in bytes.
#[instrument]
pub fn size(path: impl AsRef<Path> + std::fmt::Debug) -> Result<u64> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).with_context(|| format!("stat {path:?}"))?;
    Ok(meta.len())
}

/// Set a file's modification (and access) time.
#[instrument]
pub fn set_mtime(path: impl AsRef<Path> + std::fmt::Debug, time: SystemTime) -> Result<()> {
    let path = path.as_ref();
    set_file_mtime(path, FileTime::from_system_time(time))
        .with_context(|| format!("set mtime of {path:?}"))
}

/// Resolve a bare executable name against the directories listed in `PATH`,
/// the way `exec.LookPath` does. Does not consult `GOROOT/bin`; callers that
/// need that precedence layer it on top (see [`crate::external`]).
#[instrument]
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(name);
        return is_executable(&candidate).then_some(candidate);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        is_executable(&candidate).then_some(candidate)
    })
}

/// Express `path` relative to `base` when both are absolute, computing the
/// `../` segments needed rather than requiring `path` to be a descendant of
/// `base`. Relative `path`s and mismatched roots are returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if !path.is_absolute() || !base.is_absolute() {
        return path.to_path_buf();
    }

    let mut path_components = path.components();
    let mut base_components = base.components();
    loop {
        match (path_components.clone().next(), base_components.clone().next()) {
            (Some(p), Some(b)) if p == b => {
                path_components.next();
                base_components.next();
            }
            _ => break,
        }
    }

    let mut result = PathBuf::new();
    for _ in base_components {
        result.push("..");
    }
    for component in path_components {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() { PathBuf::from(".") } else { result }
}
