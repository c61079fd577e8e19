use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

pub fn is_java_source(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "java")
}

pub fn is_archive(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "jar" || e == "zip")
}

fn walk(base_path: &Path, wanted: fn(&Path) -> bool) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if entry.file_type().is_some_and(|t| t.is_file()) && wanted(path) {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut found: Vec<PathBuf> = rx.iter().collect();
    found.sort();
    found
}

pub fn scan_jars(base_path: &Path) -> Result<Vec<PathBuf>> {
    Ok(walk(base_path, is_archive))
}

/// Expands the declared inputs: files are kept, directories are walked for
/// `.java` sources and archives. The result is sorted and deduplicated.
pub fn expand_sources(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            out.extend(walk(input, |p| is_java_source(p) || is_archive(p)));
        } else if input.exists() {
            out.push(input.clone());
        } else {
            anyhow::bail!("source {} does not exist", input.display());
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}
