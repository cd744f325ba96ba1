use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Exit non-zero when a batch produced warnings.
    pub strict: bool,
    pub scan: ScanConfig,
    pub report: ReportConfig,
    pub sort: SortConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["vrm".to_string()],
            exclude: Vec::new(),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
    Text,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub compact: bool,
    pub csv_bom: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    #[default]
    Move,
    Copy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub mode: TransferMode,
    pub copy_then_delete: bool,
    pub dry_run: bool,
    /// Base for relative mapping directories.
    pub base_dir: PathBuf,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::Move,
            copy_then_delete: false,
            dry_run: false,
            base_dir: PathBuf::from("."),
        }
    }
}

/// Loads defaults, then `config/default.*` (or `path`, which must exist), then
/// `VRMSORT__SECTION__KEY` environment overrides.
pub fn load(path: Option<&str>) -> crate::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("VRMSORT")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
