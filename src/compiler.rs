use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::MakeConfig;
use crate::error::{MakeError, MakeResult};

#[derive(Debug, Clone, Default)]
pub struct CompileOutcome {
    pub success: bool,
    pub diagnostics: Vec<String>,
}

pub trait Compiler {
    fn compile(&mut self, sources: &[PathBuf]) -> MakeResult<CompileOutcome>;
}

#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: PathBuf,
    args: Vec<String>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl ExternalCompiler {
    pub fn new(config: &MakeConfig) -> Self {
        let mut args = vec![
            "-d".to_string(),
            config.dest_dir.to_string_lossy().to_string(),
            "-classpath".to_string(),
            config.compile_classpath(),
        ];
        let boot = crate::config::join_paths(&config.classpath.boot);
        if !boot.is_empty() {
            args.push("-bootclasspath".to_string());
            args.push(boot);
        }
        if !config.classpath.ext_dirs.is_empty() {
            args.push("-extdirs".to_string());
            args.push(crate::config::join_paths(&config.classpath.ext_dirs));
        }
        args.extend(config.compiler.extra_args.iter().cloned());
        Self {
            program: config.compiler.program.clone(),
            args,
        }
    }

    fn command(&self) -> Command {
        #[cfg(windows)]
        {
            let lower = self.program.to_string_lossy().to_ascii_lowercase();
            if lower.ends_with(".cmd") || lower.ends_with(".bat") {
                let mut cmd = Command::new("cmd");
                cmd.arg("/C").arg(&self.program);
                return cmd;
            }
        }
        Command::new(&self.program)
    }
}

fn drain<R: Read + Send + 'static>(stream: R) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        BufReader::new(stream)
            .lines()
            .map_while(Result::ok)
            .collect()
    })
}

impl Compiler for ExternalCompiler {
    fn compile(&mut self, sources: &[PathBuf]) -> MakeResult<CompileOutcome> {
        if sources.is_empty() {
            return Ok(CompileOutcome {
                success: true,
                diagnostics: Vec::new(),
            });
        }
        info!(count = sources.len(), program = %self.program.display(), "compiling");
        let mut child = self
            .command()
            .args(&self.args)
            .args(sources)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MakeError::CompilerFailure {
                reason: format!("cannot start {}: {e}", self.program.display()),
            })?;

        // Both pipes are drained while the child runs so it never blocks on
        // a full pipe buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(MakeError::CompilerFailure {
                        reason: format!("cannot wait for {}: {e}", self.program.display()),
                    });
                }
            }
        };

        let mut diagnostics = Vec::new();
        for handle in [stdout, stderr].into_iter().flatten() {
            diagnostics.extend(handle.join().unwrap_or_default());
        }
        for line in &diagnostics {
            debug!(target: "class_make::javac", "{line}");
        }

        match status.code() {
            Some(0) => Ok(CompileOutcome {
                success: true,
                diagnostics,
            }),
            Some(1) => {
                warn!(lines = diagnostics.len(), "compilation reported errors");
                Ok(CompileOutcome {
                    success: false,
                    diagnostics,
                })
            }
            other => Err(MakeError::CompilerFailure {
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    other.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")),
                    diagnostics.last().map(String::as_str).unwrap_or("no output")
                ),
            }),
        }
    }
}
