mod common;

use common::{vrm0_doc, vrm1_doc, write_garbage, write_model};
use vrmsort_core::config::{ReportConfig, ReportFormat};
use vrmsort_core::mapping::{self, Field, MappingFile};
use vrmsort_core::models::WarningKind;
use vrmsort_core::{pipeline, report};

#[test]
fn three_commercial_values_give_three_entries() {
    let temp = tempfile::tempdir().unwrap();
    let models = temp.path().join("models");
    let paths = vec![
        write_model(&models, "allowed.vrm", &vrm0_doc("A", Some("Allow"))),
        write_model(&models, "denied.vrm", &vrm0_doc("B", Some("Disallow"))),
        write_model(&models, "unknown.vrm", &vrm0_doc("C", None)),
    ];
    let out = temp.path().join("mapdata.json");

    let batch = mapping::prepare(&paths, &out).unwrap();
    assert!(batch.is_clean());

    let saved = MappingFile::load(&out).unwrap();
    assert_eq!(saved.entries.len(), 3);
    let commercial: Vec<Option<&str>> = saved
        .entries
        .iter()
        .map(|e| e.criteria[&Field::CommercialUsage].values()[0].as_deref())
        .collect();
    assert_eq!(
        commercial,
        vec![Some("allowed"), Some("disallowed"), Some("unspecified")]
    );
    for (entry, name) in saved.entries.iter().zip(["allowed.vrm", "denied.vrm", "unknown.vrm"]) {
        assert_eq!(entry.count, 1);
        assert_eq!(entry.examples, vec![name.to_string()]);
        assert!(entry.directory.is_empty());
    }
}

#[test]
fn prepare_skips_undecodable_files_with_a_warning() {
    let temp = tempfile::tempdir().unwrap();
    let good = write_model(temp.path(), "good.vrm", &vrm1_doc("Good", "corporation"));
    let bad = write_garbage(temp.path(), "bad.vrm");
    let out = temp.path().join("map.json");

    let batch = mapping::prepare(&[good, bad.clone()], &out).unwrap();
    assert_eq!(batch.items.entries.len(), 1);
    assert_eq!(batch.warnings.len(), 1);
    assert_eq!(batch.warnings[0].path, bad);
    assert!(matches!(batch.warnings[0].kind, WarningKind::Decode { .. }));
}

#[test]
fn json_report_has_one_object_per_decoded_file() {
    let temp = tempfile::tempdir().unwrap();
    let paths = vec![
        write_model(temp.path(), "a.vrm", &vrm0_doc("A", Some("Allow"))),
        write_model(temp.path(), "b.vrm", &vrm1_doc("B", "personalNonProfit")),
        write_garbage(temp.path(), "c.vrm"),
    ];
    let batch = pipeline::read_records(&paths).unwrap();
    let body = report::render(&batch.items, &ReportConfig::default()).unwrap();

    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["vrm_version"], "0.x");
    assert_eq!(rows[0]["commercial_usage"], "allowed");
    assert_eq!(rows[1]["vrm_version"], "1.0");
    assert_eq!(rows[1]["commercial_usage"], "disallowed");
    assert_eq!(rows[1]["commercial_scope"], "personalNonProfit");
    assert_eq!(batch.warnings.len(), 1);
}

#[test]
fn csv_report_rows_match_record_count_plus_header() {
    let temp = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..4)
        .map(|i| write_model(temp.path(), &format!("m{i}.vrm"), &vrm1_doc("M", "corporation")))
        .collect();
    let batch = pipeline::read_records(&paths).unwrap();
    let opts = ReportConfig {
        format: ReportFormat::Csv,
        ..Default::default()
    };
    let body = report::render(&batch.items, &opts).unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(body.as_slice());
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), batch.items.len() + 1);
    assert_eq!(&rows[0][0], "path");
}

#[test]
fn empty_batch_still_yields_valid_outputs() {
    let batch = pipeline::read_records(&[]).unwrap();
    let json = report::render(&batch.items, &ReportConfig::default()).unwrap();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&json).unwrap(), serde_json::json!([]));

    let csv_opts = ReportConfig {
        format: ReportFormat::Csv,
        ..Default::default()
    };
    let csv = report::render(&batch.items, &csv_opts).unwrap();
    assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 1);
}
