use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Ok,
    CompileErrors,
    NothingToDo,
    Config,
    DuplicateClass,
    DatabaseCorrupt,
    ClassParse,
    CompilerFailure,
    DependentArchive,
    Io,
    Internal,
}

impl ResultCode {
    pub fn code(self) -> i32 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::CompileErrors => 1,
            ResultCode::NothingToDo => 2,
            ResultCode::Config => 3,
            ResultCode::DuplicateClass => 4,
            ResultCode::DatabaseCorrupt => 5,
            ResultCode::ClassParse => 6,
            ResultCode::CompilerFailure => 7,
            ResultCode::DependentArchive => 8,
            ResultCode::Io => 9,
            ResultCode::Internal => 10,
        }
    }
}

/// Fatal conditions that abort a make run.
///
/// Genuine compile diagnostics are not an error: they are reported through
/// [`ResultCode::CompileErrors`] on an otherwise successful run.
#[derive(Debug, thiserror::Error)]
pub enum MakeError {
    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("class {class} is produced by both {first} and {second}")]
    DuplicateClass {
        class: String,
        first: String,
        second: String,
    },

    #[error("project database {path} is corrupt: {reason}; delete it and rebuild the project")]
    DatabaseCorrupt { path: PathBuf, reason: String },

    #[error("cannot parse class file {file} at offset {offset}: {reason}")]
    ClassParse {
        file: String,
        offset: usize,
        reason: String,
    },

    /// The compiler could not be run, or crashed, as opposed to reporting
    /// diagnostics for the code.
    #[error("compiler failure: {reason}")]
    CompilerFailure { reason: String },

    /// A class inside a project archive depends on a changed class and cannot
    /// be recompiled.
    #[error("class {class} in archive {archive} is affected by an incompatible change to {changed}")]
    DependentArchive {
        class: String,
        archive: String,
        changed: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl MakeError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            MakeError::Config { .. } => ResultCode::Config,
            MakeError::DuplicateClass { .. } => ResultCode::DuplicateClass,
            MakeError::DatabaseCorrupt { .. } => ResultCode::DatabaseCorrupt,
            MakeError::ClassParse { .. } => ResultCode::ClassParse,
            MakeError::CompilerFailure { .. } => ResultCode::CompilerFailure,
            MakeError::DependentArchive { .. } => ResultCode::DependentArchive,
            MakeError::Io { .. } => ResultCode::Io,
            MakeError::Internal { .. } => ResultCode::Internal,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MakeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        MakeError::Internal {
            reason: reason.into(),
        }
    }
}

pub type MakeResult<T> = Result<T, MakeError>;
