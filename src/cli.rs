use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-make")]
#[command(about = "Recompile the Java sources affected by source-incompatible changes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project database file.
    #[arg(long, value_name = "FILE", global = true)]
    pub db: Option<PathBuf>,

    /// Destination directory for compiled classes.
    #[arg(short = 'd', long, value_name = "DIR", global = true)]
    pub dest: Option<PathBuf>,

    #[arg(long, value_name = "PATHS", global = true)]
    pub classpath: Option<String>,

    /// Archives whose classes are part of the project.
    #[arg(long, value_name = "PATHS", global = true)]
    pub project_jars: Option<String>,

    #[arg(long, value_name = "PATHS", global = true)]
    pub bootclasspath: Option<String>,

    #[arg(long, value_name = "DIRS", global = true)]
    pub extdirs: Option<String>,

    /// Lookup-only class path, not passed to the compiler.
    #[arg(long, value_name = "PATHS", global = true)]
    pub vpath: Option<String>,

    /// JSON file mapping source paths to the classes they produce.
    #[arg(long, value_name = "FILE", global = true)]
    pub dep_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ArchivePolicyArg::Warn, global = true)]
    pub dependent_archives: ArchivePolicyArg,

    #[arg(long, value_name = "FILE", global = true)]
    pub javac: Option<PathBuf>,

    /// Extra compiler argument; repeatable.
    #[arg(long, value_name = "ARG", allow_hyphen_values = true, global = true)]
    pub javac_arg: Vec<String>,

    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Bring compiled classes up to date with the declared sources.
    Make {
        /// Source files, archives, or directories scanned for both.
        #[arg(value_name = "PATH")]
        sources: Vec<PathBuf>,

        #[arg(long, value_name = "FILE", num_args = 1..)]
        added: Vec<PathBuf>,

        #[arg(long, value_name = "FILE", num_args = 1..)]
        removed: Vec<PathBuf>,

        #[arg(long, value_name = "FILE", num_args = 1..)]
        updated: Vec<PathBuf>,
    },
    /// Print every database entry as JSON.
    Info,
    Stats,
    Clear,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ArchivePolicyArg {
    Ignore,
    Warn,
    Fail,
}
