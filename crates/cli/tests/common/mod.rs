#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Wraps a glTF JSON document in a binary container with a dummy BIN chunk.
pub fn glb(doc: &Value) -> Vec<u8> {
    let mut body = serde_json::to_vec(doc).unwrap();
    while body.len() % 4 != 0 {
        body.push(b' ');
    }
    let bin = [0u8; 8];
    let total = 12 + 8 + body.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

pub fn vrm1_doc(name: &str, commercial: &str) -> Value {
    json!({
        "asset": {"version": "2.0"},
        "extensions": {"VRMC_vrm": {"specVersion": "1.0", "meta": {
            "name": name,
            "authors": ["tester"],
            "avatarPermission": "onlyAuthor",
            "commercialUsage": commercial,
            "creditNotation": "required",
            "modification": "prohibited",
            "allowRedistribution": false,
            "allowExcessivelySexualUsage": false,
            "allowExcessivelyViolentUsage": false,
            "licenseUrl": "https://vrm.dev/licenses/1.0/"
        }}}
    })
}

pub fn vrm0_doc(title: &str, commercial: Option<&str>) -> Value {
    let mut meta = json!({
        "title": title,
        "author": "tester",
        "allowedUserName": "Everyone",
        "sexualUssageName": "Disallow",
        "violentUssageName": "Disallow",
        "licenseName": "CC_BY"
    });
    if let Some(c) = commercial {
        meta["commercialUssageName"] = json!(c);
    }
    json!({
        "asset": {"version": "2.0"},
        "extensions": {"VRM": {"exporterVersion": "UniVRM-0.99", "meta": meta}}
    })
}

pub fn write_model(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, glb(doc)).unwrap();
    path
}

pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"definitely not a model").unwrap();
    path
}
