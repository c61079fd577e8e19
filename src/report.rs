use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use crate::fingerprint::fingerprint_hex;
use crate::project::{ProjectDirectory, ProjectEntry};

#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub class_name: String,
    pub source: String,
    pub archive_member: Option<String>,
    pub timestamp: Option<i64>,
    pub fingerprint: Option<String>,
    pub access: Option<u16>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: usize,
    pub methods: usize,
    pub nested: usize,
}

impl EntryInfo {
    pub fn of(entry: &ProjectEntry) -> Self {
        let version = entry.old.as_ref();
        let model = entry.old_model();
        Self {
            class_name: entry.class_name.clone(),
            source: entry.source.clone(),
            archive_member: entry.archive_member.clone(),
            timestamp: version.map(|v| v.timestamp),
            fingerprint: version.map(|v| fingerprint_hex(v.fingerprint)),
            access: model.map(|m| m.access.bits()),
            superclass: model.and_then(|m| m.superclass.clone()),
            interfaces: model.map(|m| m.interfaces.clone()).unwrap_or_default(),
            fields: model.map_or(0, |m| m.fields.len()),
            methods: model.map_or(0, |m| m.methods.len()),
            nested: model.map_or(0, |m| m.nested.len()),
        }
    }
}

pub fn entries(dir: &ProjectDirectory) -> Vec<EntryInfo> {
    dir.entries().map(EntryInfo::of).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryStats {
    pub db_path: String,
    pub classes: u64,
    pub source_classes: u64,
    pub archive_classes: u64,
    pub nested_classes: u64,
    pub sources: u64,
    pub archives: u64,
}

pub fn stats(dir: &ProjectDirectory, db_path: &Path) -> DirectoryStats {
    let mut sources = BTreeSet::new();
    let mut archives = BTreeSet::new();
    let mut stats = DirectoryStats {
        db_path: db_path.to_string_lossy().to_string(),
        classes: 0,
        source_classes: 0,
        archive_classes: 0,
        nested_classes: 0,
        sources: 0,
        archives: 0,
    };
    for entry in dir.entries() {
        stats.classes += 1;
        if entry.is_archive() {
            stats.archive_classes += 1;
            archives.insert(entry.source.as_str());
        } else {
            stats.source_classes += 1;
            sources.insert(entry.source.as_str());
        }
        if entry.old_model().is_some_and(|m| m.is_nested()) {
            stats.nested_classes += 1;
        }
    }
    stats.sources = sources.len() as u64;
    stats.archives = archives.len() as u64;
    stats
}
