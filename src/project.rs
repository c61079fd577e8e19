use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{MakeError, MakeResult};
use crate::model::ClassModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Unchecked,
    Compatible,
    Incompatible,
    Deleted,
    New,
    /// The class moved to a different source or archive and the moved
    /// version is compatible with the old one.
    NewerFoundElsewhere,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassVersion {
    pub timestamp: i64,
    pub fingerprint: i64,
    pub model: ClassModel,
}

#[derive(Debug, Clone)]
pub struct ProjectEntry {
    pub class_name: String,
    pub source: String,
    pub archive_member: Option<String>,
    pub old: Option<ClassVersion>,
    pub new: Option<ClassVersion>,
    pub check: CheckResult,
}

impl ProjectEntry {
    pub fn from_source(class_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            source: source.into(),
            archive_member: None,
            old: None,
            new: None,
            check: CheckResult::New,
        }
    }

    pub fn from_archive(
        class_name: impl Into<String>,
        archive: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            source: archive.into(),
            archive_member: Some(member.into()),
            old: None,
            new: None,
            check: CheckResult::New,
        }
    }

    pub fn is_archive(&self) -> bool {
        self.archive_member.is_some()
    }

    pub fn old_model(&self) -> Option<&ClassModel> {
        self.old.as_ref().map(|v| &v.model)
    }

    pub fn new_model(&self) -> Option<&ClassModel> {
        self.new.as_ref().map(|v| &v.model)
    }

    pub fn current_model(&self) -> Option<&ClassModel> {
        self.new_model().or_else(|| self.old_model())
    }

    pub fn promote(&mut self) {
        if let Some(new) = self.new.take() {
            self.old = Some(new);
        }
    }
}

#[derive(Debug, Default)]
pub struct ProjectDirectory {
    entries: IndexMap<String, ProjectEntry>,
    /// Sources that compiled cleanly to no class at all, with the source
    /// modification time they were compiled at.
    sourceless: BTreeMap<String, i64>,
    fresh: bool,
}

impl ProjectDirectory {
    pub fn fresh() -> Self {
        Self {
            entries: IndexMap::new(),
            sourceless: BTreeMap::new(),
            fresh: true,
        }
    }

    pub fn from_entries(entries: Vec<ProjectEntry>) -> MakeResult<Self> {
        let mut dir = Self::default();
        for entry in entries {
            dir.register(entry)?;
        }
        dir.link_nesting();
        Ok(dir)
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.entries.contains_key(class)
    }

    pub fn get(&self, class: &str) -> Option<&ProjectEntry> {
        self.entries.get(class)
    }

    pub fn get_mut(&mut self, class: &str) -> Option<&mut ProjectEntry> {
        self.entries.get_mut(class)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProjectEntry> {
        self.entries.values()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ProjectEntry> {
        self.entries.values_mut()
    }

    pub fn class_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn register(&mut self, entry: ProjectEntry) -> MakeResult<&mut ProjectEntry> {
        if let Some(existing) = self.entries.get(&entry.class_name) {
            return Err(MakeError::DuplicateClass {
                class: entry.class_name.clone(),
                first: existing.source.clone(),
                second: entry.source,
            });
        }
        let name = entry.class_name.clone();
        Ok(self.entries.entry(name).or_insert(entry))
    }

    pub fn remove(&mut self, class: &str) -> Option<ProjectEntry> {
        self.entries.shift_remove(class)
    }

    pub fn classes_of_source(&self, source: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.source == source)
            .map(|e| e.class_name.clone())
            .collect()
    }

    pub fn sources(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|e| e.source.clone())
            .chain(self.sourceless.keys().cloned())
            .collect()
    }

    pub fn sourceless(&self) -> impl Iterator<Item = (&str, i64)> {
        self.sourceless.iter().map(|(s, t)| (s.as_str(), *t))
    }

    pub fn sourceless_time(&self, source: &str) -> Option<i64> {
        self.sourceless.get(source).copied()
    }

    pub fn mark_sourceless(&mut self, source: impl Into<String>, timestamp: i64) {
        self.sourceless.insert(source.into(), timestamp);
    }

    pub fn forget_sourceless(&mut self, source: &str) {
        self.sourceless.remove(source);
    }

    /// Recomputes `enclosing` on every model from the nested-class lists of
    /// their outer classes.
    pub fn link_nesting(&mut self) {
        let mut old_links = Vec::new();
        let mut new_links = Vec::new();
        for entry in self.entries.values() {
            if let Some(model) = entry.old_model() {
                for nested in model.nested_names() {
                    old_links.push((nested.to_string(), model.name.clone()));
                }
            }
            if let Some(model) = entry.new_model() {
                for nested in model.nested_names() {
                    new_links.push((nested.to_string(), model.name.clone()));
                }
            }
        }
        for (child, parent) in old_links {
            if let Some(model) = self
                .entries
                .get_mut(&child)
                .and_then(|e| e.old.as_mut())
                .map(|v| &mut v.model)
            {
                model.enclosing = Some(parent);
            }
        }
        for (child, parent) in new_links {
            if let Some(model) = self
                .entries
                .get_mut(&child)
                .and_then(|e| e.new.as_mut())
                .map(|v| &mut v.model)
            {
                model.enclosing = Some(parent);
            }
        }
    }
}
