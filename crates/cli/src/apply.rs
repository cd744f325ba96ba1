//! Sorts model files into the folders a mapping file assigns to their license terms.

use crate::fs_apply;
use crate::paths;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vrmsort_core::config::{SortConfig, TransferMode};
use vrmsort_core::extractor;
use vrmsort_core::mapping::MappingFile;
use vrmsort_core::models::{Batch, Warning, WarningKind};
use vrmsort_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct SortOptions {
    pub mode: TransferMode,
    pub copy_then_delete: bool,
    pub dry_run: bool,
    pub base_dir: PathBuf,
}

impl From<&SortConfig> for SortOptions {
    fn from(cfg: &SortConfig) -> Self {
        Self {
            mode: cfg.mode,
            copy_then_delete: cfg.copy_then_delete,
            dry_run: cfg.dry_run,
            base_dir: cfg.base_dir.clone(),
        }
    }
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SortStatus {
    Moved { destination: PathBuf },
    Copied { destination: PathBuf },
    Planned { destination: PathBuf },
    AlreadyInPlace,
    DecodeFailed { reason: String },
    Unmatched,
    Collided { destination: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SortView {
    pub path: PathBuf,
    pub directory: Option<String>,
    pub fallback: bool,
    #[serde(flatten)]
    pub status: SortStatus,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSummary {
    pub moved: usize,
    pub copied: usize,
    pub planned: usize,
    pub already_in_place: usize,
    pub decode_failed: usize,
    pub unmatched: usize,
    pub collided: usize,
    pub failed: usize,
}

impl SortSummary {
    pub fn from_views(views: &[SortView]) -> Self {
        let mut s = SortSummary::default();
        for view in views {
            match view.status {
                SortStatus::Moved { .. } => s.moved += 1,
                SortStatus::Copied { .. } => s.copied += 1,
                SortStatus::Planned { .. } => s.planned += 1,
                SortStatus::AlreadyInPlace => s.already_in_place += 1,
                SortStatus::DecodeFailed { .. } => s.decode_failed += 1,
                SortStatus::Unmatched => s.unmatched += 1,
                SortStatus::Collided { .. } => s.collided += 1,
                SortStatus::Failed { .. } => s.failed += 1,
            }
        }
        s
    }
}

/// Processes every file independently; one bad file never stops the rest.
/// Only a path that vanished before it could be read aborts the batch.
pub fn sort_by_mapping(
    files: &[PathBuf],
    mapping: &MappingFile,
    opts: &SortOptions,
) -> Result<Batch<Vec<SortView>>> {
    let mut views = Vec::with_capacity(files.len());
    let mut warnings = Vec::new();
    let mut planned: HashSet<PathBuf> = HashSet::new();

    for path in files {
        let view = sort_one(path, mapping, opts, &mut planned)?;
        if let Some(kind) = warning_for(&view.status) {
            warnings.push(Warning::new(path, kind));
        }
        debug!("{} -> {:?}", path.display(), view.status);
        views.push(view);
    }

    let s = SortSummary::from_views(&views);
    info!(
        "sort summary: moved={}, copied={}, planned={}, in_place={}, unmatched={}, collided={}, decode_failed={}, failed={}",
        s.moved, s.copied, s.planned, s.already_in_place, s.unmatched, s.collided, s.decode_failed, s.failed
    );
    Ok(Batch::new(views, warnings))
}

fn sort_one(
    path: &Path,
    mapping: &MappingFile,
    opts: &SortOptions,
    planned: &mut HashSet<PathBuf>,
) -> Result<SortView> {
    let mut view = SortView {
        path: path.to_path_buf(),
        directory: None,
        fallback: false,
        status: SortStatus::Unmatched,
    };

    let record = match extractor::read_record(path) {
        Ok(r) => r,
        Err(Error::Decode { source, .. }) => {
            view.status = SortStatus::DecodeFailed {
                reason: source.to_string(),
            };
            return Ok(view);
        }
        Err(other) => return Err(other),
    };

    let Some(route) = mapping.route(&record.classification()) else {
        return Ok(view);
    };
    view.directory = Some(route.directory.to_string());
    view.fallback = route.fallback;
    if route.fallback {
        info!("{} matched no entry, using fallback {}", record.file_name, route.directory);
    }

    let dir = paths::resolve_dir(&opts.base_dir, route.directory);
    if paths::is_in_dir(path, &dir) {
        view.status = SortStatus::AlreadyInPlace;
        return Ok(view);
    }
    let destination = dir.join(&record.file_name);

    if opts.dry_run {
        view.status = if destination.exists() || !planned.insert(destination.clone()) {
            SortStatus::Collided { destination }
        } else {
            SortStatus::Planned { destination }
        };
        return Ok(view);
    }

    view.status = match fs_apply::transfer(path, &destination, opts.mode, opts.copy_then_delete) {
        Ok(()) => {
            info!("{} -> {}", record.file_name, dir.display());
            match opts.mode {
                TransferMode::Move => SortStatus::Moved { destination },
                TransferMode::Copy => SortStatus::Copied { destination },
            }
        }
        Err(Error::Collision { path: taken }) => SortStatus::Collided { destination: taken },
        Err(e) => SortStatus::Failed {
            reason: e.to_string(),
        },
    };
    Ok(view)
}

fn warning_for(status: &SortStatus) -> Option<WarningKind> {
    match status {
        SortStatus::DecodeFailed { reason } => Some(WarningKind::Decode {
            reason: reason.clone(),
        }),
        SortStatus::Unmatched => Some(WarningKind::Unmatched),
        SortStatus::Collided { destination } => Some(WarningKind::Collision {
            destination: destination.clone(),
        }),
        SortStatus::Failed { reason } => Some(WarningKind::Transfer {
            reason: reason.clone(),
        }),
        _ => None,
    }
}
