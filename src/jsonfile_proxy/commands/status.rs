use crate::cipher;
use crate::commands::CmdResult;
use crate::error::{ProxyError, Result};
use crate::lock;
use crate::proxy::JsonFileProxy;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Missing,
    Empty,
    Plain,
    Encrypted,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FileFormat::Missing => "missing",
            FileFormat::Empty => "empty",
            FileFormat::Plain => "plain JSON",
            FileFormat::Encrypted => "encrypted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub path: PathBuf,
    pub format: FileFormat,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub lock_owner: Option<String>,
    pub locked_since: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn is_locked(&self) -> bool {
        self.lock_owner.is_some()
    }
}

/// Describe the target file and its lock without decoding any data.
pub fn run(proxy: &JsonFileProxy) -> Result<CmdResult> {
    let target = proxy.target();
    let path = target.full_path();

    let (format, size, modified) = match fs::metadata(path) {
        Ok(meta) => {
            let bytes = fs::read(path).map_err(|e| ProxyError::fs(path, e))?;
            let content = String::from_utf8_lossy(&bytes);
            let format = if content.trim().is_empty() {
                FileFormat::Empty
            } else if cipher::looks_encrypted(&content) {
                FileFormat::Encrypted
            } else {
                FileFormat::Plain
            };
            let modified = meta.modified().ok().map(DateTime::<Utc>::from);
            (format, meta.len(), modified)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => (FileFormat::Missing, 0, None),
        Err(e) => return Err(ProxyError::fs(path, e)),
    };

    let lock_owner = lock::lock_owner(target);
    let locked_since = fs::metadata(target.lock_path())
        .and_then(|meta| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    Ok(CmdResult::default().with_status(StatusReport {
        path: path.to_path_buf(),
        format,
        size,
        modified,
        lock_owner,
        locked_since,
    }))
}
