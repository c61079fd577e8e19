//! The fixed-point make loop.
//!
//! One run: load the directory, synchronize it with the declared inputs,
//! then compile → register outputs → check deletions and updates until an
//! iteration queues no further sources, and finally commit and persist.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive;
use crate::changes::{
    self, SourceSet, class_file, content_changed, mtime_millis, remove_class_file, source_key,
};
use crate::classfile::{ClassFileError, ParseOptions, parse_class};
use crate::classpath::ClassPath;
use crate::codec;
use crate::compat;
use crate::compiler::Compiler;
use crate::config::MakeConfig;
use crate::error::{MakeError, MakeResult, ResultCode};
use crate::fingerprint::fingerprint;
use crate::model::top_level_of;
use crate::project::{CheckResult, ClassVersion, ProjectDirectory, ProjectEntry};
use crate::refs::ReferenceFinder;
use crate::source;

pub type DependencyMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize)]
pub struct MakeReport {
    pub result: ResultCode,
    pub code: i32,
    pub iterations: usize,
    pub recompiled_sources: Vec<String>,
    pub updated_classes: Vec<String>,
    pub new_classes: Vec<String>,
    pub deleted_classes: Vec<String>,
    pub rebuild_all: bool,
    pub diagnostics: Vec<String>,
    pub duration_ms: u64,
}

impl MakeReport {
    fn empty(result: ResultCode) -> Self {
        Self {
            result,
            code: result.code(),
            iterations: 0,
            recompiled_sources: Vec::new(),
            updated_classes: Vec::new(),
            new_classes: Vec::new(),
            deleted_classes: Vec::new(),
            rebuild_all: false,
            diagnostics: Vec::new(),
            duration_ms: 0,
        }
    }
}

pub fn load_dependency_file(path: &Path) -> MakeResult<DependencyMap> {
    let text = std::fs::read_to_string(path).map_err(|e| MakeError::io(path, e))?;
    let raw: DependencyMap = serde_json::from_str(&text).map_err(|e| MakeError::Config {
        reason: format!("invalid dependency file {}: {e}", path.display()),
    })?;
    Ok(raw
        .into_iter()
        .map(|(source, classes)| {
            let classes = classes.into_iter().map(|c| c.replace('.', "/")).collect();
            (source, classes)
        })
        .collect())
}

/// Brings the destination directory up to date with `sources`.
pub fn make(
    config: &MakeConfig,
    sources: &SourceSet,
    compiler: &mut dyn Compiler,
) -> MakeResult<MakeReport> {
    let started = Instant::now();
    let dir = codec::load(&config.db_path)?;
    let dependencies = match &config.dependency_file {
        Some(path) => Some(load_dependency_file(path)?),
        None => None,
    };
    let classpath = ClassPath::new(&config.classpath)?;

    let changes = changes::detect(&dir, sources, &config.classpath.project_archives, &config.dest_dir)?;
    if changes.is_empty() {
        info!("nothing to do");
        let mut report = MakeReport::empty(ResultCode::NothingToDo);
        report.duration_ms = started.elapsed().as_millis() as u64;
        return Ok(report);
    }

    let mut run = Run {
        config,
        compiler,
        classpath,
        dir,
        dependencies,
        compile_failed: false,
        rebuilt_all: false,
        removed_sources: changes.removed.iter().cloned().collect(),
        content_changed: HashSet::new(),
        relocated: HashSet::new(),
        deletions_checked: HashSet::new(),
        recompiled: Vec::new(),
        diagnostics: Vec::new(),
    };
    run.synchronize(&changes)?;
    let iterations = run.fixed_point(changes.to_compile())?;
    let mut report = run.commit()?;
    report.iterations = iterations;
    report.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        result = ?report.result,
        iterations,
        recompiled = report.recompiled_sources.len(),
        "make finished"
    );
    Ok(report)
}

struct Run<'a, 'c> {
    config: &'a MakeConfig,
    compiler: &'c mut dyn Compiler,
    classpath: ClassPath,
    dir: ProjectDirectory,
    dependencies: Option<DependencyMap>,
    compile_failed: bool,
    rebuilt_all: bool,
    removed_sources: HashSet<String>,
    content_changed: HashSet<String>,
    relocated: HashSet<String>,
    deletions_checked: HashSet<String>,
    recompiled: Vec<String>,
    diagnostics: Vec<String>,
}

struct Produced {
    source: String,
    member: Option<String>,
    class: String,
    version: ClassVersion,
}

fn parse_error(file: String, err: ClassFileError) -> MakeError {
    MakeError::ClassParse {
        file,
        offset: err.offset,
        reason: err.reason,
    }
}

fn load_version(
    origin: String,
    bytes: &[u8],
    timestamp: i64,
    expected: &str,
    project: &HashSet<String>,
) -> MakeResult<ClassVersion> {
    let is_project = |c: &str| project.contains(top_level_of(c));
    let model = parse_class(bytes, &ParseOptions::full(&is_project))
        .map_err(|e| parse_error(origin.clone(), e))?;
    if model.name != expected {
        return Err(MakeError::ClassParse {
            file: origin,
            offset: 0,
            reason: format!("expected class {expected}, found {}", model.name),
        });
    }
    Ok(ClassVersion {
        timestamp,
        fingerprint: fingerprint(bytes),
        model,
    })
}

impl Run<'_, '_> {
    fn dest(&self) -> &Path {
        &self.config.dest_dir
    }

    fn project_names(&self, extra: impl IntoIterator<Item = String>) -> HashSet<String> {
        self.dir
            .entries()
            .map(|e| top_level_of(&e.class_name).to_string())
            .chain(extra)
            .collect()
    }

    fn synchronize(&mut self, delta: &changes::Changes) -> MakeResult<()> {
        for source in &delta.removed {
            let classes = changes::mark_removed(&mut self.dir, source, &self.config.dest_dir)?;
            info!(source = %source, classes = classes.len(), "source removed");
        }
        for archive in delta.new_archives.iter().chain(delta.changed_archives.iter()) {
            self.sync_archive(archive)?;
        }
        for source in &delta.stale_sources {
            for class in self.dir.classes_of_source(&source_key(source)) {
                remove_class_file(&self.config.dest_dir, &class)?;
            }
        }
        Ok(())
    }

    fn sync_archive(&mut self, path: &Path) -> MakeResult<()> {
        let key = source_key(path);
        let timestamp = mtime_millis(path)?;
        let classes = archive::read_classes(path)?;
        let project = self.project_names(classes.iter().map(|c| top_level_of(&c.class_name).to_string()));

        let loaded: Vec<MakeResult<Produced>> = classes
            .into_par_iter()
            .map(|c| {
                let origin = format!("{}!{}", path.display(), c.member);
                let version = load_version(origin, &c.bytes, timestamp, &c.class_name, &project)?;
                Ok(Produced {
                    source: key.clone(),
                    member: Some(c.member),
                    class: c.class_name,
                    version,
                })
            })
            .collect();

        let before: BTreeSet<String> = self.dir.classes_of_source(&key).into_iter().collect();
        let mut seen = BTreeSet::new();
        for item in loaded {
            let produced = item?;
            seen.insert(produced.class.clone());
            self.observe(produced, &HashSet::new())?;
        }
        for class in before.difference(&seen) {
            if let Some(entry) = self.dir.get_mut(class) {
                info!(class = %class, archive = %key, "class removed from archive");
                entry.check = CheckResult::Deleted;
                entry.new = None;
            }
        }
        debug!(archive = %key, classes = seen.len(), "archive synchronized");
        Ok(())
    }

    fn fixed_point(&mut self, initial: Vec<PathBuf>) -> MakeResult<usize> {
        let mut queue = initial;
        let mut iteration = 0;
        loop {
            iteration += 1;
            let limit = 2 * (self.dir.sources().len() + queue.len()) + 2;
            if iteration > limit {
                return Err(MakeError::internal(format!(
                    "no fixed point after {limit} iterations"
                )));
            }
            let batch = std::mem::take(&mut queue);
            if !batch.is_empty() {
                info!(iteration, sources = batch.len(), "recompiling");
                let outcome = self.compiler.compile(&batch)?;
                if !outcome.success {
                    warn!(iteration, "compilation failed");
                    self.compile_failed = true;
                }
                self.diagnostics.extend(outcome.diagnostics);
                self.recompiled.extend(batch.iter().map(|p| source_key(p)));
                self.register(&batch, outcome.success)?;
            }
            let affected = self.check()?;

            let batch_keys: HashSet<String> = batch.iter().map(|p| source_key(p)).collect();
            let mut next = BTreeSet::new();
            for class in affected {
                if let Some(entry) = self.dir.get(&class)
                    && !entry.is_archive()
                    && entry.check != CheckResult::Deleted
                    && !batch_keys.contains(&entry.source)
                    && !self.removed_sources.contains(&entry.source)
                {
                    next.insert(entry.source.clone());
                }
            }
            if next.is_empty() {
                return Ok(iteration);
            }
            debug!(iteration, queued = next.len(), "affected sources queued");
            queue = next.into_iter().map(PathBuf::from).collect();
        }
    }

    fn register(&mut self, batch: &[PathBuf], compile_ok: bool) -> MakeResult<()> {
        // class -> (source, named explicitly rather than remembered)
        let mut expected: BTreeMap<String, (String, bool)> = BTreeMap::new();
        let mut known_before: BTreeSet<String> = BTreeSet::new();
        for path in batch {
            let key = source_key(path);
            let known = self.dir.classes_of_source(&key);
            known_before.extend(known.iter().cloned());

            let strong = match self.dependencies.as_ref().and_then(|d| d.get(&key)) {
                Some(classes) => classes.clone(),
                None => source::expected_classes(path)?,
            };
            for class in strong {
                match expected.get(&class) {
                    Some((other, true)) if *other != key => {
                        return Err(MakeError::DuplicateClass {
                            class,
                            first: other.clone(),
                            second: key,
                        });
                    }
                    _ => {
                        expected.insert(class, (key.clone(), true));
                    }
                }
            }
            for class in known {
                if self.dir.get(&class).is_some_and(|e| e.old_model().is_some_and(|m| m.is_nested())) {
                    continue;
                }
                expected.entry(class).or_insert((key.clone(), false));
            }
        }

        let project = self.project_names(expected.keys().map(|c| top_level_of(c).to_string()));
        let dest = self.dest().to_path_buf();
        let strong: Vec<String> = expected
            .iter()
            .filter(|(_, (_, named))| *named)
            .map(|(class, _)| class.clone())
            .collect();
        let mut seen: HashSet<String> = expected.keys().cloned().collect();
        let mut level: Vec<(String, String)> = expected
            .into_iter()
            .map(|(class, (source, _))| (source, class))
            .collect();
        let mut produced = Vec::new();
        while !level.is_empty() {
            let loaded: Vec<MakeResult<Option<Produced>>> = level
                .par_iter()
                .map(|(source, class)| {
                    let path = class_file(&dest, class);
                    if !path.is_file() {
                        return Ok(None);
                    }
                    let bytes = std::fs::read(&path).map_err(|e| MakeError::io(&path, e))?;
                    let timestamp = mtime_millis(&path)?;
                    let version =
                        load_version(path.display().to_string(), &bytes, timestamp, class, &project)?;
                    Ok(Some(Produced {
                        source: source.clone(),
                        member: None,
                        class: class.clone(),
                        version,
                    }))
                })
                .collect();
            let mut next = Vec::new();
            for item in loaded {
                let Some(p) = item? else { continue };
                for nested in p.version.model.nested_names() {
                    if seen.insert(nested.to_string()) {
                        next.push((p.source.clone(), nested.to_string()));
                    }
                }
                produced.push(p);
            }
            level = next;
        }

        let batch_keys: HashSet<String> = batch.iter().map(|p| source_key(p)).collect();
        let mut produced_names = BTreeSet::new();
        let mut producing: HashSet<String> = HashSet::new();
        for p in produced {
            produced_names.insert(p.class.clone());
            producing.insert(p.source.clone());
            self.observe(p, &batch_keys)?;
        }
        for path in batch {
            let key = source_key(path);
            if producing.contains(&key) || !compile_ok {
                self.dir.forget_sourceless(&key);
            } else {
                debug!(source = %key, "source produced no classes");
                self.dir.mark_sourceless(key, mtime_millis(path)?);
            }
        }

        if compile_ok {
            for class in strong.iter().filter(|c| !produced_names.contains(*c)) {
                warn!(class = %class, "expected class file was not produced");
            }
        }
        for class in known_before.difference(&produced_names) {
            let Some(entry) = self.dir.get_mut(class) else {
                continue;
            };
            if !batch_keys.contains(&entry.source) {
                // Relocated to a source outside this batch.
                continue;
            }
            if compile_ok {
                info!(class = %class, source = %entry.source, "class no longer produced");
                entry.check = CheckResult::Deleted;
                entry.new = None;
            } else {
                debug!(class = %class, "class missing after failed compilation");
            }
        }
        self.dir.link_nesting();
        Ok(())
    }

    fn observe(&mut self, p: Produced, batch: &HashSet<String>) -> MakeResult<()> {
        let Produced {
            source,
            member,
            class,
            version,
        } = p;
        let Some(entry) = self.dir.get_mut(&class) else {
            debug!(class = %class, source = %source, "new class");
            let mut entry = match member {
                Some(member) => ProjectEntry::from_archive(class, source, member),
                None => ProjectEntry::from_source(class, source),
            };
            entry.new = Some(version);
            self.dir.register(entry)?;
            return Ok(());
        };

        if entry.source != source {
            let old_gone = entry.check == CheckResult::Deleted
                || self.removed_sources.contains(&entry.source)
                || batch.contains(&entry.source);
            if !old_gone {
                return Err(MakeError::DuplicateClass {
                    class,
                    first: entry.source.clone(),
                    second: source,
                });
            }
            info!(class = %class, from = %entry.source, to = %source, "class found elsewhere");
            entry.source = source;
            entry.archive_member = member;
            entry.check = CheckResult::Unchecked;
            self.relocated.insert(class.clone());
        } else if member.is_some() {
            entry.archive_member = member;
        }

        let last = entry.new.as_ref().or(entry.old.as_ref());
        if last.is_some_and(|v| v.fingerprint == version.fingerprint) {
            if entry.check == CheckResult::Unchecked {
                entry.check = if self.relocated.contains(&class) {
                    CheckResult::NewerFoundElsewhere
                } else {
                    CheckResult::Compatible
                };
            }
            entry.new = Some(version);
            return Ok(());
        }

        entry.check = if entry.old.is_some() {
            CheckResult::Unchecked
        } else {
            CheckResult::New
        };
        if content_changed(entry.old.as_ref(), version.fingerprint) {
            self.content_changed.insert(class.clone());
        }
        entry.new = Some(version);
        Ok(())
    }

    fn check(&mut self) -> MakeResult<BTreeSet<String>> {
        let deleted: Vec<String> = self
            .dir
            .entries()
            .filter(|e| e.check == CheckResult::Deleted && !self.deletions_checked.contains(&e.class_name))
            .map(|e| e.class_name.clone())
            .collect();
        let updated: Vec<String> = self
            .dir
            .entries()
            .filter(|e| e.check == CheckResult::Unchecked && e.new.is_some() && e.old.is_some())
            .map(|e| e.class_name.clone())
            .collect();

        let mut affected = BTreeSet::new();
        let mut results = Vec::new();
        let mut rebuild_all = false;
        {
            let finder = ReferenceFinder::new(&self.dir, &self.classpath, self.config.archive_policy);
            for class in &deleted {
                let dependents = finder.deleted_class_dependents(class)?;
                info!(class = %class, dependents = dependents.len(), "class deleted");
                affected.extend(dependents);
            }
            for class in &updated {
                let Some(entry) = self.dir.get(class) else {
                    continue;
                };
                let (Some(old), Some(new)) = (entry.old_model(), entry.new_model()) else {
                    continue;
                };
                let outcome = compat::compare(old, new, &finder)?;
                rebuild_all |= outcome.rebuild_all;
                affected.extend(outcome.affected.iter().cloned());
                results.push((class.clone(), outcome.check_result()));
            }
        }
        self.deletions_checked.extend(deleted);
        for (class, result) in results {
            if let Some(entry) = self.dir.get_mut(&class) {
                entry.check = match result {
                    CheckResult::Compatible if self.relocated.contains(&class) => {
                        CheckResult::NewerFoundElsewhere
                    }
                    other => other,
                };
            }
        }

        if rebuild_all && !self.rebuilt_all {
            info!("public constant changed, recompiling every source");
            self.rebuilt_all = true;
            affected.extend(
                self.dir
                    .entries()
                    .filter(|e| !e.is_archive() && e.check != CheckResult::Deleted)
                    .map(|e| e.class_name.clone()),
            );
        }
        Ok(affected)
    }

    /// Applies the commit policy and persists the directory.
    fn commit(mut self) -> MakeResult<MakeReport> {
        if self.compile_failed {
            // A stale nested class keeps its enclosing class stale too.
            let mut pending: Vec<String> = self
                .dir
                .entries()
                .filter(|e| e.check == CheckResult::Incompatible)
                .map(|e| e.class_name.clone())
                .collect();
            while let Some(class) = pending.pop() {
                let outer = self
                    .dir
                    .get(&class)
                    .and_then(|e| e.current_model())
                    .and_then(|m| m.enclosing.clone());
                if let Some(outer) = outer
                    && let Some(entry) = self.dir.get_mut(&outer)
                    && !matches!(entry.check, CheckResult::Incompatible | CheckResult::Deleted)
                {
                    debug!(class = %outer, nested = %class, "enclosing class kept stale");
                    entry.check = CheckResult::Incompatible;
                    pending.push(outer);
                }
            }
        }

        let mut updated = Vec::new();
        let mut new_classes = Vec::new();
        let mut deleted = Vec::new();
        let mut to_remove = Vec::new();
        let mut stale_outputs = Vec::new();
        for entry in self.dir.entries_mut() {
            match entry.check {
                CheckResult::New => {
                    new_classes.push(entry.class_name.clone());
                    entry.promote();
                }
                CheckResult::Compatible | CheckResult::NewerFoundElsewhere => {
                    if self.content_changed.contains(&entry.class_name)
                        || entry.check == CheckResult::NewerFoundElsewhere
                    {
                        updated.push(entry.class_name.clone());
                    }
                    entry.promote();
                }
                CheckResult::Incompatible => {
                    if self.compile_failed {
                        // Removing the output makes the source stale, so the
                        // next run recompiles and rechecks it.
                        entry.new = None;
                        if !entry.is_archive() {
                            stale_outputs.push(entry.class_name.clone());
                        }
                    } else {
                        updated.push(entry.class_name.clone());
                        entry.promote();
                    }
                }
                CheckResult::Deleted => {
                    if self.compile_failed {
                        entry.new = None;
                    } else {
                        to_remove.push(entry.class_name.clone());
                    }
                }
                CheckResult::Unchecked => {
                    if entry.new.is_some() {
                        warn!(class = %entry.class_name, "unchecked class version discarded");
                        entry.new = None;
                    }
                }
            }
            entry.check = CheckResult::Unchecked;
        }
        for class in &stale_outputs {
            remove_class_file(&self.config.dest_dir, class)?;
        }
        for class in &to_remove {
            self.dir.remove(class);
            deleted.push(class.clone());
        }
        self.dir.link_nesting();
        codec::save(&self.dir, &self.config.db_path)?;

        let result = if self.compile_failed {
            ResultCode::CompileErrors
        } else {
            ResultCode::Ok
        };
        let mut report = MakeReport::empty(result);
        report.recompiled_sources = self.recompiled;
        report.updated_classes = updated;
        report.new_classes = new_classes;
        report.deleted_classes = deleted;
        report.rebuild_all = self.rebuilt_all;
        report.diagnostics = self.diagnostics;
        Ok(report)
    }
}
