//! Output targets. File output goes through a sibling temp file that is renamed
//! over the destination, so an interrupted run never leaves a half-written file.

use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => Destination::File(p),
            None => Destination::Stdout,
        }
    }

    pub fn emit(&self, contents: &[u8]) -> Result<()> {
        match self {
            Destination::Stdout => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                lock.write_all(contents)
                    .and_then(|_| lock.flush())
                    .map_err(|e| Error::write("<stdout>", e))
            }
            Destination::File(path) => write_atomic(path, contents),
        }
    }
}

pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let fail = |e: io::Error| Error::write(path, e);
    fs::create_dir_all(dir).map_err(fail)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(contents).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    debug!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
