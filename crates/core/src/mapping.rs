//! Mapping files: which folder each license classification is sorted into.
//!
//! `prepare` writes one entry per distinct classification found in a batch with
//! an empty `directory`; the user fills the folders in and hands the file back
//! to the sorter, which only reads it.
//!
//! Prepared entries name every classification field. Hand-written entries may
//! name fewer: an omitted field accepts any value, a list accepts any of its
//! values, and text compares trimmed and case-insensitively.

use crate::error::{Error, Result};
use crate::models::{Batch, Classification, LicenseRecord, Permission};
use crate::output;
use crate::pipeline;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MAPPING_VERSION: u32 = 1;
pub const MAX_EXAMPLES: usize = 3;

/// A classification field an entry can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    AvatarPermission,
    CommercialUsage,
    CreditNotation,
    Modification,
    Redistribution,
    SexualUsage,
    ViolentUsage,
    License,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::AvatarPermission,
        Field::CommercialUsage,
        Field::CreditNotation,
        Field::Modification,
        Field::Redistribution,
        Field::SexualUsage,
        Field::ViolentUsage,
        Field::License,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::AvatarPermission => "avatar_permission",
            Field::CommercialUsage => "commercial_usage",
            Field::CreditNotation => "credit_notation",
            Field::Modification => "modification",
            Field::Redistribution => "redistribution",
            Field::SexualUsage => "sexual_usage",
            Field::ViolentUsage => "violent_usage",
            Field::License => "license",
        }
    }

    fn permission(&self, c: &Classification) -> Option<Permission> {
        match self {
            Field::CommercialUsage => Some(c.commercial_usage),
            Field::Modification => Some(c.modification),
            Field::Redistribution => Some(c.redistribution),
            Field::SexualUsage => Some(c.sexual_usage),
            Field::ViolentUsage => Some(c.violent_usage),
            _ => None,
        }
    }

    fn text<'a>(&self, c: &'a Classification) -> Option<&'a str> {
        match self {
            Field::AvatarPermission => c.avatar_permission.as_deref(),
            Field::CreditNotation => c.credit_notation.as_deref(),
            Field::License => c.license.as_deref(),
            _ => None,
        }
    }

    fn is_permission(&self) -> bool {
        !matches!(
            self,
            Field::AvatarPermission | Field::CreditNotation | Field::License
        )
    }

    /// The value as the preparer writes it.
    fn value(&self, c: &Classification) -> Option<String> {
        match self.permission(c) {
            Some(p) => Some(p.as_str().to_string()),
            None => self.text(c).map(str::to_string),
        }
    }

    fn accepts(&self, wanted: Option<&str>, c: &Classification) -> bool {
        match self.permission(c) {
            Some(actual) => permission_of(wanted) == Some(actual),
            None => normalize(wanted) == normalize(self.text(c)),
        }
    }
}

fn permission_of(value: Option<&str>) -> Option<Permission> {
    match value {
        None => Some(Permission::Unspecified),
        Some(s) => Permission::from_name(s),
    }
}

/// Blank and `--` both mean absent, as in the text report.
fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "--")
        .map(str::to_lowercase)
}

/// Accepted values for one field; `null` stands for an absent value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition(Vec<Option<String>>);

impl Condition {
    pub fn one(value: Option<String>) -> Self {
        Condition(vec![value])
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.0
    }

    fn accepts(&self, field: Field, c: &Classification) -> bool {
        self.0.iter().any(|v| field.accepts(v.as_deref(), c))
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(scalar)
                .collect::<std::result::Result<Vec<_>, _>>()?,
            other => vec![scalar(other)?],
        };
        if values.is_empty() {
            return Err(de::Error::custom("an empty list accepts nothing"));
        }
        Ok(Condition(values))
    }
}

fn scalar<E: de::Error>(value: Value) -> std::result::Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s)),
        _ => Err(E::custom("expected a string, boolean, null or a list of them")),
    }
}

/// Field tests of one entry; all must hold. Unknown field names fail to load.
pub type Criteria = BTreeMap<Field, Condition>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Catch-all folder for files no entry claims. Unset leaves them in place.
    #[serde(default)]
    pub fallback_directory: Option<String>,
    pub entries: Vec<MappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub examples: Vec<String>,
    pub criteria: Criteria,
}

impl MappingEntry {
    pub fn matches(&self, classification: &Classification) -> bool {
        !self.criteria.is_empty()
            && self
                .criteria
                .iter()
                .all(|(field, cond)| cond.accepts(*field, classification))
    }
}

/// Where a classification should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub directory: &'a str,
    pub fallback: bool,
}

fn default_version() -> u32 {
    MAPPING_VERSION
}

fn default_notes() -> Vec<String> {
    vec![
        "Set \"directory\" on each entry to the folder its files should be sorted into.".to_string(),
        "Entries left with an empty directory are reported as unmatched and stay in place.".to_string(),
        "Criteria may drop fields (any value) or list several values (any of them).".to_string(),
        "Set \"fallback_directory\" to collect every file no entry claims.".to_string(),
    ]
}

fn criteria_of(classification: &Classification) -> Criteria {
    Field::ALL
        .iter()
        .map(|f| (*f, Condition::one(f.value(classification))))
        .collect()
}

impl MappingFile {
    /// Groups records by classification, in order of first appearance.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a LicenseRecord>,
    {
        let mut index: BTreeMap<Classification, usize> = BTreeMap::new();
        let mut entries: Vec<MappingEntry> = Vec::new();
        for record in records {
            let key = record.classification();
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                entries.push(MappingEntry {
                    directory: String::new(),
                    count: 0,
                    examples: Vec::new(),
                    criteria: criteria_of(&key),
                });
                entries.len() - 1
            });
            let entry = &mut entries[slot];
            entry.count += 1;
            if entry.examples.len() < MAX_EXAMPLES {
                entry.examples.push(record.file_name.clone());
            }
        }
        Self {
            version: MAPPING_VERSION,
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
            notes: default_notes(),
            fallback_directory: None,
            entries,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_path_buf(),
            },
            _ => Error::mapping(path, e),
        })?;
        let mapping: MappingFile =
            serde_json::from_str(&content).map_err(|e| Error::mapping(path, e))?;
        if mapping.version > MAPPING_VERSION {
            return Err(Error::mapping(
                path,
                format!("unsupported version {}", mapping.version),
            ));
        }
        mapping.validate().map_err(|reason| Error::mapping(path, reason))?;
        Ok(mapping)
    }

    /// Rejects entries that could never match.
    fn validate(&self) -> std::result::Result<(), String> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.criteria.is_empty() {
                return Err(format!("entry {} has no criteria", i + 1));
            }
            for (field, cond) in entry.criteria.iter().filter(|(f, _)| f.is_permission()) {
                if let Some(bad) = cond
                    .values()
                    .iter()
                    .flatten()
                    .find(|v| Permission::from_name(v).is_none())
                {
                    return Err(format!(
                        "entry {}: `{bad}` is not a permission for {}",
                        i + 1,
                        field.as_str()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut body = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::write(path, io::Error::from(e)))?;
        body.push(b'\n');
        output::write_atomic(path, &body)
    }

    /// First matching entry with a folder set, else the fallback folder.
    pub fn route(&self, classification: &Classification) -> Option<Route<'_>> {
        let matched = self
            .entries
            .iter()
            .filter(|e| e.matches(classification))
            .map(|e| e.directory.trim())
            .find(|d| !d.is_empty())
            .map(|directory| Route {
                directory,
                fallback: false,
            });
        matched.or_else(|| {
            self.fallback_directory
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|directory| Route {
                    directory,
                    fallback: true,
                })
        })
    }
}

/// Decodes every path and writes a mapping template to `destination`.
/// Decode failures become warnings; a missing input or a failed write is fatal.
pub fn prepare(paths: &[PathBuf], destination: &Path) -> Result<Batch<MappingFile>> {
    let decoded = pipeline::read_records(paths)?;
    let mapping = MappingFile::from_records(&decoded.items);
    mapping.save(destination)?;
    info!(
        "mapping template with {} entries for {} files written to {}",
        mapping.entries.len(),
        decoded.items.len(),
        destination.display()
    );
    Ok(Batch::new(mapping, decoded.warnings))
}
