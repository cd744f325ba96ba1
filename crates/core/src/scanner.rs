//! Expands command-line inputs (files, directories, glob patterns) into model file paths.

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Resolves every input into file paths, keeping argument order and dropping duplicates.
///
/// An argument naming an existing file or folder is taken literally even if it
/// contains pattern characters. A literal path that does not exist is fatal; a
/// pattern that matches nothing is not.
pub fn expand_inputs(inputs: &[String], cfg: &ScanConfig) -> Result<Vec<PathBuf>> {
    let excludes = build_globset(&cfg.exclude)?;
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        // Existing paths win over pattern syntax: `Avatar [v2].vrm` is a file name.
        let path = PathBuf::from(input);
        let found = if path.is_dir() {
            walk_dir(&path, cfg, &excludes)
        } else if path.exists() {
            vec![path]
        } else if is_pattern(input) {
            let matched = expand_pattern(input, cfg, &excludes)?;
            if matched.is_empty() {
                warn!("pattern {input} matched no files");
            }
            matched
        } else {
            return Err(Error::NotFound { path });
        };
        for path in found {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    debug!("expanded {} inputs into {} files", inputs.len(), files.len());
    Ok(files)
}

pub fn is_pattern(input: &str) -> bool {
    input.contains(GLOB_CHARS)
}

fn walk_dir(root: &Path, cfg: &ScanConfig, excludes: &GlobSet) -> Vec<PathBuf> {
    walk(root, None, cfg, excludes)
        .into_iter()
        .filter(|p| has_model_extension(p, &cfg.extensions))
        .collect()
}

fn expand_pattern(pattern: &str, cfg: &ScanConfig, excludes: &GlobSet) -> Result<Vec<PathBuf>> {
    let matcher = compile_pattern(pattern)?;
    let (root, rest) = split_literal_prefix(pattern);
    let max_depth = if rest.contains("**") {
        None
    } else {
        Some(Path::new(&rest).components().count().max(1))
    };
    let from_cwd = root.as_os_str().is_empty();
    let root = if from_cwd { PathBuf::from(".") } else { root };

    let matched = walk(&root, max_depth, cfg, excludes)
        .into_iter()
        .map(|p| {
            if from_cwd {
                p.strip_prefix(".").map(Path::to_path_buf).unwrap_or(p)
            } else {
                p
            }
        })
        .filter(|p| matcher.is_match(p))
        .collect();
    Ok(matched)
}

fn walk(root: &Path, max_depth: Option<usize>, cfg: &ScanConfig, excludes: &GlobSet) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }
    let mut files = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || should_descend(e.path(), cfg.include_hidden, excludes))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let normalized = pattern.strip_prefix("./").unwrap_or(pattern);
    Ok(GlobBuilder::new(normalized)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Splits `models/2024/*.vrm` into the walk root `models/2024` and the rest `*.vrm`.
fn split_literal_prefix(pattern: &str) -> (PathBuf, String) {
    let mut root = PathBuf::new();
    let mut rest = Vec::new();
    let mut in_pattern = false;
    for component in Path::new(pattern).components() {
        let part = component.as_os_str().to_string_lossy();
        if !in_pattern && !part.contains(GLOB_CHARS) {
            if component != Component::CurDir {
                root.push(component.as_os_str());
            }
        } else {
            in_pattern = true;
            rest.push(part.into_owned());
        }
    }
    (root, rest.join("/"))
}

fn has_model_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, include_hidden: bool, excludes: &GlobSet) -> bool {
    if excludes.is_match(path) {
        return false;
    }
    if !include_hidden && is_hidden(path) {
        return false;
    }
    true
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn cfg() -> ScanConfig {
        ScanConfig::default()
    }

    #[test]
    fn splits_literal_prefix() {
        let (root, rest) = split_literal_prefix("models/2024/*.vrm");
        assert_eq!(root, PathBuf::from("models/2024"));
        assert_eq!(rest, "*.vrm");
        let (root, rest) = split_literal_prefix("**/*.vrm");
        assert_eq!(root, PathBuf::new());
        assert_eq!(rest, "**/*.vrm");
    }

    #[test]
    fn directory_input_keeps_model_files_only() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("a.vrm"));
        touch(&temp.path().join("nested/B.VRM"));
        touch(&temp.path().join("notes.txt"));
        touch(&temp.path().join(".cache/c.vrm"));

        let inputs = vec![temp.path().to_string_lossy().into_owned()];
        let files = expand_inputs(&inputs, &cfg()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.vrm", "B.VRM"]);
    }

    #[test]
    fn pattern_star_does_not_cross_directories() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("a.vrm"));
        touch(&temp.path().join("sub/b.vrm"));

        let base = temp.path().to_string_lossy().replace('\\', "/");
        let flat = expand_inputs(&[format!("{base}/*.vrm")], &cfg()).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = expand_inputs(&[format!("{base}/**/*.vrm")], &cfg()).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn missing_literal_path_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope.vrm").to_string_lossy().into_owned();
        assert!(matches!(
            expand_inputs(&[missing], &cfg()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn empty_pattern_match_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.vrm", temp.path().to_string_lossy().replace('\\', "/"));
        assert!(expand_inputs(&[pattern], &cfg()).unwrap().is_empty());
    }

    #[test]
    fn existing_file_with_bracket_name_is_literal() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Avatar [v2].vrm");
        touch(&file);
        touch(&temp.path().join("Avatar v.vrm"));
        let files = expand_inputs(&[file.to_string_lossy().into_owned()], &cfg()).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn duplicate_inputs_are_collapsed() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a.vrm");
        touch(&file);
        let arg = file.to_string_lossy().into_owned();
        let files = expand_inputs(&[arg.clone(), arg], &cfg()).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn excludes_prune_subtrees() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("keep/a.vrm"));
        touch(&temp.path().join("sorted/b.vrm"));
        let cfg = ScanConfig {
            exclude: vec!["**/sorted".to_string()],
            ..ScanConfig::default()
        };
        let files = expand_inputs(&[temp.path().to_string_lossy().into_owned()], &cfg).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep/a.vrm"));
    }
}
