use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;

use crate::error::{MakeError, MakeResult};
use crate::project::{CheckResult, ClassVersion, ProjectDirectory};
use crate::scan::is_archive;

#[derive(Debug, Clone)]
pub enum SourceSet {
    /// The complete list of project sources and archives. Anything the
    /// directory knows that is missing here was removed.
    Declared(Vec<PathBuf>),
    Explicit {
        added: Vec<PathBuf>,
        removed: Vec<PathBuf>,
        updated: Vec<PathBuf>,
    },
}

#[derive(Debug, Default)]
pub struct Changes {
    pub new_sources: Vec<PathBuf>,
    pub stale_sources: Vec<PathBuf>,
    pub new_archives: Vec<PathBuf>,
    pub changed_archives: Vec<PathBuf>,
    pub removed: Vec<String>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.new_sources.is_empty()
            && self.stale_sources.is_empty()
            && self.new_archives.is_empty()
            && self.changed_archives.is_empty()
            && self.removed.is_empty()
    }

    pub fn to_compile(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self
            .new_sources
            .iter()
            .chain(self.stale_sources.iter())
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

pub fn source_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

pub fn mtime_millis(path: &Path) -> MakeResult<i64> {
    let modified = path
        .metadata()
        .and_then(|m| m.modified())
        .map_err(|e| MakeError::io(path, e))?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(i64::try_from(millis).unwrap_or(i64::MAX))
}

pub fn class_file(dest: &Path, class: &str) -> PathBuf {
    dest.join(format!("{class}.class"))
}

/// Partitions the declared inputs against the directory. `project_archives`
/// are always part of the project, whatever the source set says.
pub fn detect(
    dir: &ProjectDirectory,
    sources: &SourceSet,
    project_archives: &[PathBuf],
    dest: &Path,
) -> MakeResult<Changes> {
    let known = dir.sources();
    let mut changes = Changes::default();

    let (present, removed): (Vec<PathBuf>, Vec<String>) = match sources {
        SourceSet::Declared(paths) => {
            let mut present: Vec<PathBuf> = paths.clone();
            present.extend(project_archives.iter().cloned());
            present.sort();
            present.dedup();
            let declared: BTreeSet<String> = present.iter().map(|p| source_key(p)).collect();
            let removed = known
                .iter()
                .filter(|k| !declared.contains(*k))
                .cloned()
                .collect();
            (present, removed)
        }
        SourceSet::Explicit {
            added,
            removed,
            updated,
        } => {
            let mut present: Vec<PathBuf> = added
                .iter()
                .chain(updated.iter())
                .chain(project_archives.iter())
                .cloned()
                .collect();
            present.sort();
            present.dedup();
            let removed = removed
                .iter()
                .map(|p| source_key(p))
                .filter(|k| known.contains(k))
                .collect();
            (present, removed)
        }
    };
    changes.removed = removed;

    let explicit_updates: BTreeSet<String> = match sources {
        SourceSet::Explicit { updated, .. } => updated.iter().map(|p| source_key(p)).collect(),
        SourceSet::Declared(_) => BTreeSet::new(),
    };

    for path in present {
        let key = source_key(&path);
        if !path.exists() {
            return Err(MakeError::Config {
                reason: format!("source {key} does not exist"),
            });
        }
        let archive = is_archive(&path);
        if !known.contains(&key) {
            if archive {
                changes.new_archives.push(path);
            } else {
                changes.new_sources.push(path);
            }
            continue;
        }
        let stale = if archive {
            archive_changed(dir, &key, &path)?
        } else {
            explicit_updates.contains(&key) || source_stale(dir, &key, &path, dest)?
        };
        if stale {
            if archive {
                changes.changed_archives.push(path);
            } else {
                changes.stale_sources.push(path);
            }
        }
    }
    debug!(
        new = changes.new_sources.len(),
        stale = changes.stale_sources.len(),
        new_archives = changes.new_archives.len(),
        changed_archives = changes.changed_archives.len(),
        removed = changes.removed.len(),
        "detected changes"
    );
    Ok(changes)
}

/// A source is stale when one of its class files is missing or not
/// strictly newer than the source.
fn source_stale(dir: &ProjectDirectory, key: &str, path: &Path, dest: &Path) -> MakeResult<bool> {
    let source_time = mtime_millis(path)?;
    if dir.sourceless_time(key).is_some_and(|t| t != source_time) {
        return Ok(true);
    }
    for class in dir.classes_of_source(key) {
        let file = class_file(dest, &class);
        if !file.is_file() || mtime_millis(&file)? <= source_time {
            return Ok(true);
        }
    }
    Ok(false)
}

fn archive_changed(dir: &ProjectDirectory, key: &str, path: &Path) -> MakeResult<bool> {
    let now = mtime_millis(path)?;
    Ok(dir
        .classes_of_source(key)
        .iter()
        .filter_map(|c| dir.get(c).and_then(|e| e.old.as_ref()))
        .any(|v| v.timestamp != now))
}

/// Marks every class of a removed source as deleted and removes its class
/// files from `dest` right away, so a leftover file cannot hide the
/// deletion from the compiler.
pub fn mark_removed(dir: &mut ProjectDirectory, source: &str, dest: &Path) -> MakeResult<Vec<String>> {
    dir.forget_sourceless(source);
    let classes = dir.classes_of_source(source);
    for class in &classes {
        if let Some(entry) = dir.get_mut(class) {
            entry.check = CheckResult::Deleted;
            entry.new = None;
            if !entry.is_archive() {
                remove_class_file(dest, class)?;
            }
        }
    }
    Ok(classes)
}

pub fn remove_class_file(dest: &Path, class: &str) -> MakeResult<()> {
    let file = class_file(dest, class);
    match std::fs::remove_file(&file) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MakeError::io(file, e)),
    }
}

/// Whether a freshly observed class differs from its persisted version.
/// Timestamps only pre-filter; the fingerprint decides.
pub fn content_changed(old: Option<&ClassVersion>, fingerprint: i64) -> bool {
    old.is_none_or(|v| v.fingerprint != fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassModel;
    use crate::project::ProjectEntry;
    use std::fs;
    use std::time::Duration;

    fn set_mtime(path: &Path, millis: i64) -> std::io::Result<()> {
        let time = UNIX_EPOCH + Duration::from_millis(millis as u64);
        fs::File::options().write(true).open(path)?.set_modified(time)
    }

    fn known(dir: &mut ProjectDirectory, class: &str, source: &Path, timestamp: i64) {
        let mut entry = ProjectEntry::from_source(class, source_key(source));
        entry.old = Some(ClassVersion {
            timestamp,
            fingerprint: 7,
            model: ClassModel::new(class),
        });
        dir.register(entry).unwrap();
    }

    #[test]
    fn detect_partitions_declared_sources() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dest = tmp.path().join("out");
        fs::create_dir_all(dest.join("p"))?;
        let fresh = tmp.path().join("A.java");
        let current = tmp.path().join("B.java");
        let touched = tmp.path().join("C.java");
        for f in [&fresh, &current, &touched] {
            fs::write(f, "class X {}")?;
            set_mtime(f, 1_000_000)?;
        }
        let b_class = dest.join("p/B.class");
        fs::write(&b_class, b"b")?;
        set_mtime(&b_class, 2_000_000)?;
        let c_class = dest.join("p/C.class");
        fs::write(&c_class, b"c")?;
        set_mtime(&c_class, 1_000_000)?;

        let mut dir = ProjectDirectory::default();
        known(&mut dir, "p/B", &current, 2_000_000);
        known(&mut dir, "p/C", &touched, 1_000_000);
        known(&mut dir, "p/Gone", &tmp.path().join("Gone.java"), 1);

        let set = SourceSet::Declared(vec![fresh.clone(), current, touched.clone()]);
        let changes = detect(&dir, &set, &[], &dest)?;
        assert_eq!(changes.new_sources, vec![fresh]);
        assert_eq!(changes.stale_sources, vec![touched]);
        assert_eq!(changes.removed, vec![source_key(&tmp.path().join("Gone.java"))]);
        assert!(!changes.is_empty());
        Ok(())
    }

    #[test]
    fn missing_class_file_makes_source_stale() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let src = tmp.path().join("A.java");
        fs::write(&src, "class A {}")?;
        let mut dir = ProjectDirectory::default();
        known(&mut dir, "A", &src, 1);

        let changes = detect(&dir, &SourceSet::Declared(vec![src.clone()]), &[], tmp.path())?;
        assert_eq!(changes.stale_sources, vec![src]);
        Ok(())
    }

    #[test]
    fn archives_are_checked_by_mtime() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let jar = tmp.path().join("lib.jar");
        fs::write(&jar, b"x")?;
        set_mtime(&jar, 5_000)?;

        let mut dir = ProjectDirectory::default();
        let mut entry = ProjectEntry::from_archive("l/A", source_key(&jar), "l/A.class");
        entry.old = Some(ClassVersion {
            timestamp: 5_000,
            fingerprint: 1,
            model: ClassModel::new("l/A"),
        });
        dir.register(entry).unwrap();

        let unchanged = detect(&dir, &SourceSet::Declared(vec![]), &[jar.clone()], tmp.path())?;
        assert!(unchanged.is_empty());

        set_mtime(&jar, 6_000)?;
        let changed = detect(&dir, &SourceSet::Declared(vec![jar.clone()]), &[], tmp.path())?;
        assert_eq!(changed.changed_archives, vec![jar]);
        Ok(())
    }

    #[test]
    fn explicit_lists_are_taken_at_their_word() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let a = tmp.path().join("A.java");
        let b = tmp.path().join("B.java");
        fs::write(&a, "")?;
        fs::write(&b, "")?;
        let mut dir = ProjectDirectory::default();
        known(&mut dir, "A", &a, 1);
        known(&mut dir, "Old", &tmp.path().join("Old.java"), 1);

        let set = SourceSet::Explicit {
            added: vec![b.clone()],
            removed: vec![tmp.path().join("Old.java")],
            updated: vec![a.clone()],
        };
        let changes = detect(&dir, &set, &[], tmp.path())?;
        assert_eq!(changes.new_sources, vec![b]);
        assert_eq!(changes.stale_sources, vec![a]);
        assert_eq!(changes.removed.len(), 1);
        Ok(())
    }

    #[test]
    fn mark_removed_deletes_class_files() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dest = tmp.path();
        fs::create_dir_all(dest.join("p"))?;
        fs::write(dest.join("p/A.class"), b"a")?;
        let mut dir = ProjectDirectory::default();
        known(&mut dir, "p/A", Path::new("A.java"), 1);

        let classes = mark_removed(&mut dir, "A.java", dest)?;
        assert_eq!(classes, vec!["p/A".to_string()]);
        assert!(!dest.join("p/A.class").exists());
        assert_eq!(dir.get("p/A").unwrap().check, CheckResult::Deleted);
        Ok(())
    }

    #[test]
    fn sourceless_source_is_stale_only_when_touched() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let info = tmp.path().join("package-info.java");
        fs::write(&info, "package p;")?;
        set_mtime(&info, 1_000_000)?;
        let mut dir = ProjectDirectory::default();
        dir.mark_sourceless(source_key(&info), 1_000_000);

        let set = SourceSet::Declared(vec![info.clone()]);
        assert!(detect(&dir, &set, &[], tmp.path())?.is_empty());

        set_mtime(&info, 1_500_000)?;
        assert_eq!(detect(&dir, &set, &[], tmp.path())?.stale_sources, vec![info.clone()]);

        let gone = detect(&dir, &SourceSet::Declared(vec![]), &[], tmp.path())?;
        assert_eq!(gone.removed, vec![source_key(&info)]);
        mark_removed(&mut dir, &source_key(&info), tmp.path())?;
        assert!(dir.sources().is_empty());
        Ok(())
    }

    #[test]
    fn fingerprint_decides_content_change() {
        let v = ClassVersion {
            timestamp: 1,
            fingerprint: 42,
            model: ClassModel::new("A"),
        };
        assert!(!content_changed(Some(&v), 42));
        assert!(content_changed(Some(&v), 43));
        assert!(content_changed(None, 42));
    }
}
