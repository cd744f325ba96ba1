use crate::error::{Error, Result};
use crate::extractor::{self, VrmDocument};
use crate::models::{Batch, LicenseRecord, Warning, WarningKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decodes each path in order. Undecodable files become warnings; a missing
/// path aborts the batch.
pub fn read_records(paths: &[PathBuf]) -> Result<Batch<Vec<LicenseRecord>>> {
    decode_each(paths, extractor::read_record)
}

pub fn read_documents(paths: &[PathBuf]) -> Result<Batch<Vec<VrmDocument>>> {
    decode_each(paths, extractor::read_document)
}

fn decode_each<T, F>(paths: &[PathBuf], decode: F) -> Result<Batch<Vec<T>>>
where
    F: Fn(&Path) -> Result<T>,
{
    let mut items = Vec::with_capacity(paths.len());
    let mut warnings = Vec::new();
    for path in paths {
        match decode(path) {
            Ok(item) => items.push(item),
            Err(Error::Decode { path, source }) => {
                let warning = Warning::new(
                    path,
                    WarningKind::Decode {
                        reason: source.to_string(),
                    },
                );
                debug!("{warning}");
                warnings.push(warning);
            }
            Err(other) => return Err(other),
        }
    }
    info!(
        "decoded {} of {} files ({} skipped)",
        items.len(),
        paths.len(),
        warnings.len()
    );
    Ok(Batch::new(items, warnings))
}
