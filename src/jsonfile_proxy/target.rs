//! # Target Resolution
//!
//! A [`Target`] is the identity of the file an adapter persists to: the absolute
//! containing directory, the bare filename and the absolute full path. It is
//! derived once from the configured path and never changes afterwards.
//!
//! The lock file used to guard writes lives next to the target:
//!
//! ```text
//! /var/data/
//! ├── db.json        # the target
//! └── db.json.lock   # present only while a write is in progress
//! ```

use crate::error::{ProxyError, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const LOCK_SUFFIX: &str = ".lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    directory: PathBuf,
    filename: String,
    full_path: PathBuf,
}

impl Target {
    /// Resolve a configured path (which need not exist) against the current
    /// working directory.
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ProxyError::Configuration(
                "No database path configured".to_string(),
            ));
        }

        let absolute = if path.is_absolute() {
            normalize(path)
        } else {
            let cwd = std::env::current_dir().map_err(|e| ProxyError::fs(path, e))?;
            normalize(&cwd.join(path))
        };

        let filename = absolute
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ProxyError::Configuration(format!(
                    "{} does not name a file",
                    absolute.display()
                ))
            })?;

        let directory = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Ok(Self {
            directory,
            filename,
            full_path: absolute,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Sibling lock file: `<full_path>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        let mut raw: OsString = self.full_path.clone().into_os_string();
        raw.push(LOCK_SUFFIX);
        PathBuf::from(raw)
    }

    pub fn exists(&self) -> bool {
        self.full_path.is_file()
    }
}

/// Lexically collapse `.` and `..` segments without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Create `dir` and every missing ancestor.
///
/// Succeeds silently when the directory already exists. Fails when an existing
/// non-directory occupies one of the path segments, or when creation is denied.
/// Walks the ancestors in a loop so deep paths do not grow the stack.
pub fn ensure_directory<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();

    let mut missing = Vec::new();
    let mut cursor = Some(dir);
    while let Some(current) = cursor {
        if current.as_os_str().is_empty() {
            break;
        }
        match fs::metadata(current) {
            Ok(meta) if meta.is_dir() => break,
            Ok(_) => {
                return Err(ProxyError::fs(
                    current,
                    io::Error::other("path segment is occupied by a file"),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                missing.push(current);
                cursor = current.parent();
            }
            Err(e) => return Err(ProxyError::fs(current, e)),
        }
    }

    for segment in missing.into_iter().rev() {
        match fs::create_dir(segment) {
            Ok(()) => tracing::debug!(path = %segment.display(), "created directory"),
            // Someone else created it between the probe and now.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && segment.is_dir() => {}
            Err(e) => return Err(ProxyError::fs(segment, e)),
        }
    }

    Ok(())
}
