use anyhow::{Context, Result};
use clap::Parser;
use class_make::changes::SourceSet;
use class_make::cli::{Cli, Commands};
use class_make::codec;
use class_make::compiler::ExternalCompiler;
use class_make::config::{MakeConfig, clear_db, resolve_config, resolve_db_path};
use class_make::error::{MakeError, ResultCode};
use class_make::make::make;
use class_make::report;
use class_make::scan::{expand_sources, is_archive};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(err) => {
            let code = exit_code(&err);
            error!(code = code.code(), "{err:#}");
            ExitCode::from(code.code() as u8)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("class_make=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("class_make=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Errors raised by the engine keep their own code; anything else comes
/// from argument handling.
fn exit_code(err: &anyhow::Error) -> ResultCode {
    err.chain()
        .find_map(|e| e.downcast_ref::<MakeError>())
        .map_or(ResultCode::Config, MakeError::result_code)
}

fn run(cli: &Cli) -> Result<ResultCode> {
    match cli.command.clone() {
        Commands::Make {
            sources,
            added,
            removed,
            updated,
        } => {
            let mut config = resolve_config(cli)?;
            let set = source_set(&mut config, sources, added, removed, updated)?;
            let mut javac = ExternalCompiler::new(&config);
            let report = make(&config, &set, &mut javac)?;
            print_json(&report)?;
            Ok(report.result)
        }
        Commands::Info => {
            let dir = codec::load(&resolve_db_path(cli))?;
            print_json(&report::entries(&dir))?;
            Ok(ResultCode::Ok)
        }
        Commands::Stats => {
            let db_path = resolve_db_path(cli);
            let dir = codec::load(&db_path)?;
            print_json(&report::stats(&dir, &db_path))?;
            Ok(ResultCode::Ok)
        }
        Commands::Clear => {
            clear_db(&resolve_db_path(cli))?;
            Ok(ResultCode::Ok)
        }
    }
}

fn source_set(
    config: &mut MakeConfig,
    sources: Vec<PathBuf>,
    added: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    updated: Vec<PathBuf>,
) -> Result<SourceSet> {
    let explicit = !(added.is_empty() && removed.is_empty() && updated.is_empty());
    if explicit && !sources.is_empty() {
        anyhow::bail!("positional sources cannot be combined with --added/--removed/--updated");
    }
    if !explicit && sources.is_empty() {
        anyhow::bail!("no sources given; pass the project's sources or directories");
    }

    let archives = &mut config.classpath.project_archives;
    if explicit {
        archives.extend(added.iter().chain(updated.iter()).filter(|p| is_archive(p)).cloned());
        return Ok(SourceSet::Explicit {
            added,
            removed,
            updated,
        });
    }

    let expanded = expand_sources(&sources).context("Failed to expand sources")?;
    let (jars, java): (Vec<PathBuf>, Vec<PathBuf>) = expanded.into_iter().partition(|p| is_archive(p));
    debug!(sources = java.len(), archives = jars.len(), "expanded inputs");
    archives.extend(jars);
    archives.sort();
    archives.dedup();
    Ok(SourceSet::Declared(java))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_exit_code() {
        let err = anyhow::Error::from(MakeError::internal("loop"));
        assert_eq!(exit_code(&err), ResultCode::Internal);

        let wrapped = anyhow::Error::from(MakeError::DatabaseCorrupt {
            path: PathBuf::from("p.pdb"),
            reason: "truncated".to_string(),
        })
        .context("loading");
        assert_eq!(exit_code(&wrapped), ResultCode::DatabaseCorrupt);

        assert_eq!(exit_code(&anyhow::anyhow!("bad flag")), ResultCode::Config);
    }

    #[test]
    fn declared_archives_join_project_archives() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(tmp.path().join("A.java"), "class A {}")?;
        std::fs::write(tmp.path().join("lib.jar"), "")?;
        let mut config = MakeConfig::new(tmp.path().join("p.pdb"), tmp.path().join("out"));

        let set = source_set(&mut config, vec![tmp.path().to_path_buf()], vec![], vec![], vec![])?;
        let SourceSet::Declared(java) = set else {
            panic!("expected a declared source set");
        };
        assert_eq!(java, vec![tmp.path().join("A.java")]);
        assert_eq!(config.classpath.project_archives, vec![tmp.path().join("lib.jar")]);
        Ok(())
    }

    #[test]
    fn positional_and_explicit_sources_conflict() {
        let mut config = MakeConfig::new("p.pdb", "out");
        let err = source_set(
            &mut config,
            vec![PathBuf::from("A.java")],
            vec![PathBuf::from("B.java")],
            vec![],
            vec![],
        );
        assert!(err.is_err());
    }
}
