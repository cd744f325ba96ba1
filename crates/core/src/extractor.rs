//! Reads the license metadata embedded in VRM model files.
//!
//! A VRM file is a binary glTF container. Only the 20-byte header and the
//! leading JSON chunk are read; the binary buffer chunk is never loaded.

use crate::error::{DecodeError, Error, Result};
use crate::models::{LicenseRecord, Permission, VrmVersion};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;
const HEADER_LEN: u64 = 12;
const CHUNK_HEADER_LEN: u64 = 8;

/// The embedded glTF JSON of one model file.
#[derive(Debug, Clone)]
pub struct VrmDocument {
    pub path: PathBuf,
    pub version: VrmVersion,
    pub json: Value,
}

impl VrmDocument {
    pub fn meta(&self) -> Option<&Map<String, Value>> {
        let key = match self.version {
            VrmVersion::V0 => "VRM",
            VrmVersion::V1 => "VRMC_vrm",
        };
        self.json
            .get("extensions")
            .and_then(|e| e.get(key))
            .and_then(|v| v.get("meta"))
            .and_then(Value::as_object)
    }

    pub fn license_record(&self) -> LicenseRecord {
        let empty = Map::new();
        let meta = self.meta().unwrap_or(&empty);
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned());
        match self.version {
            VrmVersion::V0 => vrm0_record(self.path.clone(), file_name, meta),
            VrmVersion::V1 => vrm1_record(self.path.clone(), file_name, meta),
        }
    }
}

/// Decodes the license metadata of a single file.
pub fn read_record(path: &Path) -> Result<LicenseRecord> {
    let doc = read_document(path)?;
    Ok(doc.license_record())
}

pub fn read_document(path: &Path) -> Result<VrmDocument> {
    let decode = |source: DecodeError| Error::Decode {
        path: path.to_path_buf(),
        source,
    };
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(decode(e.into())),
    };
    let available = file.metadata().map_err(|e| decode(e.into()))?.len();
    let json = read_json_chunk(BufReader::new(file), available).map_err(decode)?;
    let version = detect_version(&json).map_err(decode)?;
    debug!("decoded {} (VRM {})", path.display(), version);
    Ok(VrmDocument {
        path: path.to_path_buf(),
        version,
        json,
    })
}

/// Parses the GLB header and returns the JSON chunk. `available` is the total
/// input length, used to reject chunk lengths that run past the end.
pub fn read_json_chunk<R: Read>(
    mut reader: R,
    available: u64,
) -> std::result::Result<Value, DecodeError> {
    let mut header = [0u8; HEADER_LEN as usize];
    fill(&mut reader, &mut header, HEADER_LEN, available)?;
    let magic = [header[0], header[1], header[2], header[3]];
    if &magic != GLB_MAGIC {
        return Err(DecodeError::BadMagic(magic));
    }
    let version = le_u32(&header[4..8]);
    if version != GLB_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let mut chunk_header = [0u8; CHUNK_HEADER_LEN as usize];
    fill(
        &mut reader,
        &mut chunk_header,
        HEADER_LEN + CHUNK_HEADER_LEN,
        available,
    )?;
    let chunk_len = le_u32(&chunk_header[0..4]) as u64;
    let chunk_type = le_u32(&chunk_header[4..8]);
    if chunk_type != CHUNK_TYPE_JSON {
        return Err(DecodeError::MissingJsonChunk(chunk_type));
    }
    let needed = HEADER_LEN + CHUNK_HEADER_LEN + chunk_len;
    if needed > available {
        return Err(DecodeError::Truncated { needed, available });
    }

    let mut body = vec![0u8; chunk_len as usize];
    fill(&mut reader, &mut body, needed, available)?;
    let text = std::str::from_utf8(&body)?;
    let text = text.trim_end_matches(|c: char| c == ' ' || c == '\0');
    Ok(serde_json::from_str(text)?)
}

fn fill<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    needed: u64,
    available: u64,
) -> std::result::Result<(), DecodeError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::Truncated { needed, available },
        _ => DecodeError::Io(e),
    })
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn detect_version(json: &Value) -> std::result::Result<VrmVersion, DecodeError> {
    let extensions = json
        .get("extensions")
        .and_then(Value::as_object)
        .ok_or(DecodeError::MissingVrmExtension)?;
    if extensions.contains_key("VRMC_vrm") {
        Ok(VrmVersion::V1)
    } else if extensions.contains_key("VRM") {
        Ok(VrmVersion::V0)
    } else {
        Err(DecodeError::MissingVrmExtension)
    }
}

fn vrm0_record(path: PathBuf, file_name: String, meta: &Map<String, Value>) -> LicenseRecord {
    let other_permission_url = text(meta, "otherPermissionUrl");
    let redistribution = other_permission_url
        .as_deref()
        .map(redistribution_from_url)
        .unwrap_or_default();
    LicenseRecord {
        path,
        file_name,
        vrm_version: VrmVersion::V0,
        model_name: text(meta, "title"),
        author: text(meta, "author"),
        contact: text(meta, "contactInformation"),
        reference_url: text(meta, "reference"),
        avatar_permission: text(meta, "allowedUserName"),
        commercial_usage: flag(meta, "commercialUssageName"),
        commercial_scope: None,
        credit_notation: text(meta, "creditNotation"),
        modification: flag(meta, "modification"),
        redistribution,
        sexual_usage: flag(meta, "sexualUssageName"),
        violent_usage: flag(meta, "violentUssageName"),
        license: text(meta, "licenseName"),
        other_permission_url,
        other_license_url: text(meta, "otherLicenseUrl"),
    }
}

fn vrm1_record(path: PathBuf, file_name: String, meta: &Map<String, Value>) -> LicenseRecord {
    let commercial_scope = text(meta, "commercialUsage");
    let commercial_usage = match commercial_scope.as_deref() {
        Some("personalNonProfit") => Permission::Disallowed,
        Some("personalProfit") | Some("corporation") => Permission::Allowed,
        Some(other) => Permission::from_name(other).unwrap_or_default(),
        None => Permission::Unspecified,
    };
    let modification = match text(meta, "modification").as_deref() {
        Some("prohibited") => Permission::Disallowed,
        Some("allowModification") | Some("allowModificationRedistribution") => {
            Permission::Allowed
        }
        Some(other) => Permission::from_name(other).unwrap_or_default(),
        None => Permission::Unspecified,
    };
    LicenseRecord {
        path,
        file_name,
        vrm_version: VrmVersion::V1,
        model_name: text(meta, "name"),
        author: text(meta, "authors"),
        contact: text(meta, "contactInformation"),
        reference_url: text(meta, "references"),
        avatar_permission: text(meta, "avatarPermission"),
        commercial_usage,
        commercial_scope,
        credit_notation: text(meta, "creditNotation"),
        modification,
        redistribution: flag(meta, "allowRedistribution"),
        sexual_usage: flag(meta, "allowExcessivelySexualUsage"),
        violent_usage: flag(meta, "allowExcessivelyViolentUsage"),
        license: text(meta, "licenseUrl"),
        other_permission_url: None,
        other_license_url: text(meta, "otherLicenseUrl"),
    }
}

/// String-ish metadata value; arrays of strings are joined, blanks count as absent.
fn text(meta: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match meta.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn flag(meta: &Map<String, Value>, key: &str) -> Permission {
    match meta.get(key) {
        Some(Value::Bool(b)) => Permission::from_flag(Some(*b)),
        Some(Value::String(s)) => Permission::from_name(s).unwrap_or_default(),
        _ => Permission::Unspecified,
    }
}

/// VRM 0.x has no redistribution field; authors put it in the permission URL query.
/// Scheme-less values such as `example.com/terms?redistribution=false` are common.
fn redistribution_from_url(raw: &str) -> Permission {
    let query = match url::Url::parse(raw) {
        Ok(url) => url.query().map(str::to_string),
        Err(_) => raw.split_once('?').map(|(_, q)| q.to_string()),
    };
    let Some(query) = query else {
        return Permission::Unspecified;
    };
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "redistribution")
        .and_then(|(_, v)| Permission::from_name(&v))
        .unwrap_or_default()
}
