use std::fs;
use std::path::{Path, PathBuf};

/// Mapping folders are taken as is when absolute, else relative to `base`.
pub fn resolve_dir(base: &Path, directory: &str) -> PathBuf {
    let dir = Path::new(directory);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}

/// Returns true if `file` already sits directly in `dir`.
pub fn is_in_dir(file: &Path, dir: &Path) -> bool {
    let parent = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), fs::canonicalize(dir)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
