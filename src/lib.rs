//! # class-make
//!
//! Incremental build driver for Java: recompiles the sources whose classes
//! changed, then only the dependents a change can actually break.
//!
//! ## Architecture
//!
//! - **classfile**: class file parser producing a [`model::ClassModel`]
//! - **model**: class, member and reference model with normalized descriptors
//! - **project**: the project directory of tracked classes and their versions
//! - **codec**: binary persistence of the project directory
//! - **classpath**: lookup of non-project classes for hierarchy queries
//! - **refs**: reference finder answering "who depends on this"
//! - **compat**: source-compatibility checker between two class versions
//! - **changes**: detection of new, stale and removed sources and archives
//! - **compiler**: external `javac` runner
//! - **make**: the fixed-point recompilation loop
//! - **source**: top-level declarations of `.java` files via tree-sitter
//! - **scan**: expansion of source directories
//! - **archive**: project and classpath `.jar` access
//! - **report**: JSON views for the maintenance commands

pub mod archive;
pub mod buffer;
pub mod changes;
pub mod classfile;
pub mod classpath;
pub mod cli;
pub mod codec;
pub mod compat;
pub mod compiler;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod make;
pub mod model;
pub mod project;
pub mod refs;
pub mod report;
pub mod scan;
pub mod source;

#[cfg(test)]
mod testutil;
