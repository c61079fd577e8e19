use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::{ArchivePolicyArg, Cli};

pub const DEFAULT_DB_FILE: &str = "class-make.pdb";
pub const JAVAC_ENV: &str = "CLASS_MAKE_JAVAC";

/// What to do when a class inside a project archive is affected by an
/// incompatible change. Archive classes cannot be recompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependentArchivePolicy {
    Ignore,
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct ClassPathConfig {
    pub project_archives: Vec<PathBuf>,
    pub standard: Vec<PathBuf>,
    pub boot: Vec<PathBuf>,
    pub ext_dirs: Vec<PathBuf>,
    /// Extra lookup-only locations, never passed to the compiler.
    pub virtual_path: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub program: PathBuf,
    pub extra_args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("javac"),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MakeConfig {
    pub db_path: PathBuf,
    pub dest_dir: PathBuf,
    pub classpath: ClassPathConfig,
    /// Optional JSON file mapping source paths to the classes they produce.
    pub dependency_file: Option<PathBuf>,
    pub archive_policy: DependentArchivePolicy,
    pub compiler: CompilerConfig,
}

impl MakeConfig {
    pub fn new(db_path: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            dest_dir: dest_dir.into(),
            classpath: ClassPathConfig::default(),
            dependency_file: None,
            archive_policy: DependentArchivePolicy::default(),
            compiler: CompilerConfig::default(),
        }
    }

    /// Class path string passed to the compiler: destination directory first,
    /// then project archives and the standard class path.
    pub fn compile_classpath(&self) -> String {
        let mut parts = vec![self.dest_dir.clone()];
        parts.extend(self.classpath.project_archives.iter().cloned());
        parts.extend(self.classpath.standard.iter().cloned());
        join_paths(&parts)
    }
}

pub fn join_paths(paths: &[PathBuf]) -> String {
    let sep = if cfg!(windows) { ";" } else { ":" };
    paths
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn split_paths(raw: &str) -> Vec<PathBuf> {
    env::split_paths(raw)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

pub fn resolve_db_path(cli: &Cli) -> PathBuf {
    cli.db
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

pub fn resolve_javac(cli: &Cli) -> PathBuf {
    if let Some(p) = cli.javac.clone() {
        return p;
    }
    if let Ok(p) = env::var(JAVAC_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from("javac")
}

pub fn resolve_config(cli: &Cli) -> Result<MakeConfig> {
    let dest_dir = cli.dest.clone().unwrap_or_else(|| PathBuf::from("."));
    if dest_dir.exists() && !dest_dir.is_dir() {
        anyhow::bail!(
            "destination {} exists and is not a directory",
            dest_dir.display()
        );
    }
    std::fs::create_dir_all(&dest_dir).with_context(|| {
        format!("Failed to create destination directory: {}", dest_dir.display())
    })?;

    let mut config = MakeConfig::new(resolve_db_path(cli), dest_dir);
    config.classpath = ClassPathConfig {
        project_archives: cli.project_jars.as_deref().map(split_paths).unwrap_or_default(),
        standard: cli.classpath.as_deref().map(split_paths).unwrap_or_default(),
        boot: cli.bootclasspath.as_deref().map(split_paths).unwrap_or_default(),
        ext_dirs: cli.extdirs.as_deref().map(split_paths).unwrap_or_default(),
        virtual_path: cli.vpath.as_deref().map(split_paths).unwrap_or_default(),
    };
    config.dependency_file = cli.dep_file.clone();
    config.archive_policy = match cli.dependent_archives {
        ArchivePolicyArg::Ignore => DependentArchivePolicy::Ignore,
        ArchivePolicyArg::Warn => DependentArchivePolicy::Warn,
        ArchivePolicyArg::Fail => DependentArchivePolicy::Fail,
    };
    config.compiler = CompilerConfig {
        program: resolve_javac(cli),
        extra_args: cli.javac_arg.clone(),
    };
    Ok(config)
}

pub fn clear_db(db_path: &Path) -> Result<()> {
    if db_path.exists() {
        std::fs::remove_file(db_path)
            .with_context(|| format!("Failed to remove project database: {}", db_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn resolve_config_maps_cli_options() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let dest = tmp.path().join("out");
        let cli = Cli::parse_from([
            "class-make",
            "--db",
            "/tmp/p.pdb",
            "-d",
            dest.to_str().unwrap(),
            "--classpath",
            "a.jar:b.jar",
            "--dependent-archives",
            "fail",
            "--javac",
            "/opt/jdk/bin/javac",
            "--javac-arg=-g",
            "stats",
        ]);
        let config = resolve_config(&cli)?;
        assert_eq!(config.db_path, PathBuf::from("/tmp/p.pdb"));
        assert!(dest.is_dir());
        assert_eq!(config.classpath.standard.len(), 2);
        assert_eq!(config.archive_policy, DependentArchivePolicy::Fail);
        assert_eq!(config.compiler.program, PathBuf::from("/opt/jdk/bin/javac"));
        assert_eq!(config.compiler.extra_args, vec!["-g".to_string()]);
        Ok(())
    }

    #[test]
    fn compile_classpath_starts_with_destination() {
        let mut config = MakeConfig::new("p.pdb", "out");
        config.classpath.standard.push(PathBuf::from("lib.jar"));
        let cp = config.compile_classpath();
        assert!(cp.starts_with("out"));
        assert!(cp.ends_with("lib.jar"));
    }

    #[test]
    fn clear_db_removes_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let db = tmp.path().join("p.pdb");
        std::fs::write(&db, b"x")?;
        clear_db(&db)?;
        assert!(!db.exists());
        clear_db(&db)?;
        Ok(())
    }
}
