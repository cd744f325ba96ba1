//! Renders decoded license records as JSON, CSV or a plain-text listing.

use crate::config::{ReportConfig, ReportFormat};
use crate::extractor::VrmDocument;
use crate::models::LicenseRecord;
use serde::Serialize;
use std::io;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ABSENT: &str = "--";

pub fn render(records: &[LicenseRecord], opts: &ReportConfig) -> io::Result<Vec<u8>> {
    match opts.format {
        ReportFormat::Json => to_json(records, opts.compact),
        ReportFormat::Csv => to_csv(records, opts.csv_bom),
        ReportFormat::Text => Ok(to_text(records).into_bytes()),
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> io::Result<Vec<u8>> {
    let mut out = if compact {
        serde_json::to_vec(value)?
    } else {
        serde_json::to_vec_pretty(value)?
    };
    out.push(b'\n');
    Ok(out)
}

/// Header row is always written, so an empty batch still yields a valid table.
pub fn to_csv(records: &[LicenseRecord], bom: bool) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if bom {
        buf.extend_from_slice(UTF8_BOM);
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(buf);
    writer.write_record(LicenseRecord::FIELDS.iter().map(|(key, _)| *key))?;
    for record in records {
        let cells = record.cells();
        writer.write_record(cells.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}

pub fn to_text(records: &[LicenseRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "\n=== License Information for {} (VRM {}) ===\n",
            record.file_name, record.vrm_version
        ));
        for ((_, label), cell) in LicenseRecord::FIELDS.iter().zip(record.cells()) {
            out.push_str(&format!("{:<20}: {}\n", label, cell.as_deref().unwrap_or(ABSENT)));
        }
    }
    out
}

#[derive(Serialize)]
struct RawDump<'a> {
    files: Vec<RawEntry<'a>>,
}

#[derive(Serialize)]
struct RawEntry<'a> {
    filename: String,
    metadata: &'a serde_json::Value,
}

/// The complete embedded glTF JSON of each file, for inspecting fields the records leave out.
pub fn raw_dump(docs: &[VrmDocument], compact: bool) -> io::Result<Vec<u8>> {
    let files = docs
        .iter()
        .map(|doc| RawEntry {
            filename: doc
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            metadata: &doc.json,
        })
        .collect();
    to_json(&RawDump { files }, compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, VrmVersion};
    use std::path::PathBuf;

    fn record(name: &str) -> LicenseRecord {
        LicenseRecord {
            path: PathBuf::from(format!("in/{name}")),
            file_name: name.to_string(),
            vrm_version: VrmVersion::V0,
            model_name: Some("Model, \"quoted\"".to_string()),
            author: None,
            contact: None,
            reference_url: None,
            avatar_permission: Some("Everyone".to_string()),
            commercial_usage: Permission::Allowed,
            commercial_scope: None,
            credit_notation: None,
            modification: Permission::Unspecified,
            redistribution: Permission::Disallowed,
            sexual_usage: Permission::Unspecified,
            violent_usage: Permission::Unspecified,
            license: Some("CC0".to_string()),
            other_permission_url: None,
            other_license_url: None,
        }
    }

    #[test]
    fn json_keeps_field_order_and_count() {
        let records = vec![record("a.vrm"), record("b.vrm")];
        let out = String::from_utf8(to_json(&records, false).unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        let first_key = out.find("\"path\"").unwrap();
        let later_key = out.find("\"commercial_usage\"").unwrap();
        assert!(first_key < later_key);
        assert_eq!(parsed[0]["author"], serde_json::Value::Null);
        assert_eq!(parsed[0]["redistribution"], "disallowed");
    }

    #[test]
    fn csv_quotes_and_leaves_absent_cells_empty() {
        let out = to_csv(&[record("a.vrm")], false).unwrap();
        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), LicenseRecord::FIELDS.len());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][3], "Model, \"quoted\"");
        assert_eq!(&rows[0][4], "");
        assert!(String::from_utf8(out).unwrap().contains("\"Model, \"\"quoted\"\"\""));
    }

    #[test]
    fn empty_csv_has_header_only() {
        let out = String::from_utf8(to_csv(&[], false).unwrap()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("path,file_name,vrm_version"));
    }

    #[test]
    fn csv_bom_prefix() {
        let out = to_csv(&[], true).unwrap();
        assert!(out.starts_with(UTF8_BOM));
    }

    #[test]
    fn text_listing_marks_absent_values() {
        let out = to_text(&[record("a.vrm")]);
        assert!(out.contains("=== License Information for a.vrm (VRM 0.x) ==="));
        assert!(out.contains("Author              : --"));
        assert!(out.contains("Commercial Usage    : allowed"));
    }
}
