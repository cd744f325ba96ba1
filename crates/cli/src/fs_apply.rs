use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::debug;
use vrmsort_core::config::TransferMode;
use vrmsort_core::{Error, Result};

/// Moves or copies `from` to `to`, never replacing an existing file, even one
/// another process creates while the transfer runs.
///
/// Missing parent folders are created. A plain move links the file under its
/// new name and unlinks the old one; when linking is not possible (e.g. across
/// devices) or `copy_then_delete` is set, the file is copied and the source
/// removed.
pub fn transfer(from: &Path, to: &Path, mode: TransferMode, copy_then_delete: bool) -> Result<()> {
    if to.exists() {
        return Err(Error::Collision {
            path: to.to_path_buf(),
        });
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }
    match mode {
        TransferMode::Copy => copy_new(from, to),
        TransferMode::Move if copy_then_delete => move_by_copy(from, to),
        TransferMode::Move => link_then_unlink(from, to),
    }
}

/// `rename` silently replaces an existing target on Unix; `hard_link` refuses.
fn link_then_unlink(from: &Path, to: &Path) -> Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => fs::remove_file(from).map_err(|e| Error::write(from, e)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::Collision {
            path: to.to_path_buf(),
        }),
        Err(e) => {
            debug!("link {} failed ({e}), copying instead", from.display());
            move_by_copy(from, to)
        }
    }
}

fn move_by_copy(from: &Path, to: &Path) -> Result<()> {
    copy_new(from, to)?;
    fs::remove_file(from).map_err(|e| Error::write(from, e))
}

/// Copies into a freshly created file; `create_new` closes the race with a
/// concurrent writer taking the same name.
fn copy_new(from: &Path, to: &Path) -> Result<()> {
    let mut src = File::open(from).map_err(|e| Error::write(from, e))?;
    let mut dest = match OpenOptions::new().write(true).create_new(true).open(to) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::Collision {
                path: to.to_path_buf(),
            })
        }
        Err(e) => return Err(Error::write(to, e)),
    };
    let copied = io::copy(&mut src, &mut dest).and_then(|_| dest.sync_all());
    if let Err(e) = copied {
        drop(dest);
        let _ = fs::remove_file(to);
        return Err(Error::write(to, e));
    }
    if let Ok(meta) = src.metadata() {
        let _ = fs::set_permissions(to, meta.permissions());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_creates_destination_folder() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("a.vrm");
        fs::write(&src, "model").unwrap();
        let dest = temp.path().join("sorted/inner/a.vrm");
        transfer(&src, &dest, TransferMode::Move, false).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "model");
    }

    #[test]
    fn copy_keeps_source() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("a.vrm");
        fs::write(&src, "model").unwrap();
        let dest = temp.path().join("copies/a.vrm");
        transfer(&src, &dest, TransferMode::Copy, false).unwrap();
        assert!(src.exists());
        assert!(dest.exists());
    }

    #[test]
    fn copy_then_delete_moves() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("a.vrm");
        fs::write(&src, "model").unwrap();
        let dest = temp.path().join("out/a.vrm");
        transfer(&src, &dest, TransferMode::Move, true).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "model");
    }

    #[test]
    fn move_never_replaces_a_file_that_appears_late() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("a.vrm");
        let dest = temp.path().join("a-sorted.vrm");
        fs::write(&src, "new").unwrap();
        // created after the existence check would have run
        fs::write(&dest, "old").unwrap();
        let err = link_then_unlink(&src, &dest).unwrap_err();
        assert!(matches!(err, Error::Collision { .. }));
        assert_eq!(fs::read_to_string(&src).unwrap(), "new");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");

        let err = move_by_copy(&src, &dest).unwrap_err();
        assert!(matches!(err, Error::Collision { .. }));
        assert!(src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
    }

    #[test]
    fn existing_destination_is_a_collision() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("a.vrm");
        let dest = temp.path().join("out/a.vrm");
        fs::write(&src, "new").unwrap();
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "old").unwrap();
        let err = transfer(&src, &dest, TransferMode::Move, false).unwrap_err();
        assert!(matches!(err, Error::Collision { .. }));
        assert!(src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
    }
}
