use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Tri-state usage flag. `Unspecified` is a real answer, not a missing `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Allowed,
    Disallowed,
    #[default]
    Unspecified,
}

impl Permission {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Permission::Allowed,
            Some(false) => Permission::Disallowed,
            None => Permission::Unspecified,
        }
    }

    /// Accepts our own names plus the spellings found in VRM metadata and query strings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "allowed" | "allow" | "true" | "yes" => Some(Permission::Allowed),
            "disallowed" | "disallow" | "false" | "no" | "not allowed" => {
                Some(Permission::Disallowed)
            }
            "unspecified" | "" | "--" => Some(Permission::Unspecified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Allowed => "allowed",
            Permission::Disallowed => "disallowed",
            Permission::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
            Null(()),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => Ok(Permission::from_flag(Some(flag))),
            Raw::Null(()) => Ok(Permission::Unspecified),
            Raw::Name(name) => Permission::from_name(&name).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "unknown permission `{name}`, expected allowed, disallowed or unspecified"
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VrmVersion {
    #[serde(rename = "0.x")]
    V0,
    #[serde(rename = "1.0")]
    V1,
}

impl fmt::Display for VrmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VrmVersion::V0 => f.write_str("0.x"),
            VrmVersion::V1 => f.write_str("1.0"),
        }
    }
}

/// Usage terms decoded from one model file.
///
/// Field order is the serialized order for every report format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub path: PathBuf,
    pub file_name: String,
    pub vrm_version: VrmVersion,
    pub model_name: Option<String>,
    pub author: Option<String>,
    pub contact: Option<String>,
    pub reference_url: Option<String>,
    pub avatar_permission: Option<String>,
    pub commercial_usage: Permission,
    pub commercial_scope: Option<String>,
    pub credit_notation: Option<String>,
    pub modification: Permission,
    pub redistribution: Permission,
    pub sexual_usage: Permission,
    pub violent_usage: Permission,
    pub license: Option<String>,
    pub other_permission_url: Option<String>,
    pub other_license_url: Option<String>,
}

impl LicenseRecord {
    /// Column keys and display labels, in serialized order.
    pub const FIELDS: [(&'static str, &'static str); 18] = [
        ("path", "Path"),
        ("file_name", "File Name"),
        ("vrm_version", "VRM Version"),
        ("model_name", "Model Name"),
        ("author", "Author"),
        ("contact", "Contact Information"),
        ("reference_url", "Reference URL"),
        ("avatar_permission", "Avatar Permission"),
        ("commercial_usage", "Commercial Usage"),
        ("commercial_scope", "Commercial Scope"),
        ("credit_notation", "Credit Notation"),
        ("modification", "Modification"),
        ("redistribution", "Redistribution"),
        ("sexual_usage", "Sexual Expression"),
        ("violent_usage", "Violence Expression"),
        ("license", "License"),
        ("other_permission_url", "Other Permission URL"),
        ("other_license_url", "Other License URL"),
    ];

    /// Cell values in `FIELDS` order; `None` marks an absent optional field.
    pub fn cells(&self) -> [Option<String>; 18] {
        [
            Some(self.path.to_string_lossy().into_owned()),
            Some(self.file_name.clone()),
            Some(self.vrm_version.to_string()),
            self.model_name.clone(),
            self.author.clone(),
            self.contact.clone(),
            self.reference_url.clone(),
            self.avatar_permission.clone(),
            Some(self.commercial_usage.to_string()),
            self.commercial_scope.clone(),
            self.credit_notation.clone(),
            Some(self.modification.to_string()),
            Some(self.redistribution.to_string()),
            Some(self.sexual_usage.to_string()),
            Some(self.violent_usage.to_string()),
            self.license.clone(),
            self.other_permission_url.clone(),
            self.other_license_url.clone(),
        ]
    }

    pub fn classification(&self) -> Classification {
        Classification {
            avatar_permission: self.avatar_permission.clone(),
            commercial_usage: self.commercial_usage,
            credit_notation: self.credit_notation.clone(),
            modification: self.modification,
            redistribution: self.redistribution,
            sexual_usage: self.sexual_usage,
            violent_usage: self.violent_usage,
            license: self.license.clone(),
        }
    }
}

/// The fields a mapping groups by. Equality is structural over the whole tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Classification {
    pub avatar_permission: Option<String>,
    pub commercial_usage: Permission,
    pub credit_notation: Option<String>,
    pub modification: Permission,
    pub redistribution: Permission,
    pub sexual_usage: Permission,
    pub violent_usage: Permission,
    pub license: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    Decode { reason: String },
    Unmatched,
    Collision { destination: PathBuf },
    Transfer { reason: String },
}

/// A per-file problem that does not stop the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    pub fn new(path: impl Into<PathBuf>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.kind {
            WarningKind::Decode { reason } => write!(f, "{path}: skipped, {reason}"),
            WarningKind::Unmatched => write!(f, "{path}: no mapping entry, left in place"),
            WarningKind::Collision { destination } => {
                write!(f, "{path}: {} already exists", destination.display())
            }
            WarningKind::Transfer { reason } => write!(f, "{path}: transfer failed, {reason}"),
        }
    }
}

/// Output of a batch operation together with the per-file problems met on the way.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub items: T,
    pub warnings: Vec<Warning>,
}

impl<T> Batch<T> {
    pub fn new(items: T, warnings: Vec<Warning>) -> Self {
        Self { items, warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
