//! Folder sorting for the CLI: orchestration, single-file transfers and path policy.
pub mod apply;
pub mod fs_apply;
pub mod paths;
