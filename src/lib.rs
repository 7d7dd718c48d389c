//! # class-deps
//!
//! Reads compiled Java classes and the jars that carry them, and works out
//! which classes they reference, which of those nothing provides, and which
//! entries appear more than once across a set of archives.
//!
//! ## Architecture
//!
//! - **reader**: Big-endian primitives and modified-UTF8 strings over a byte slice
//! - **constant_pool**: Tagged pool entries addressed by 1-based index
//! - **class_file**: Single-pass parser producing a `ClassDescriptor`
//! - **descriptor**: Lazily resolved names, access labels, summaries and text reports
//! - **references**: Pool-only scan for referenced class names
//! - **resolver**: Included/missing set arithmetic over provided and system classes
//! - **duplicates**: Path and checksum matching across archive entries
//! - **entry** / **archive** / **manifest**: Jar contents, entry metadata and Class-Path
//! - **scan**: Jar discovery for system classpath elements
//! - **system**: Lazily loaded, explicitly owned system class cache
//! - **session**: An opened jar (plus its Class-Path) or class file
//! - **config** / **cli**: Command-line options, system classpath resolution and logging

pub mod archive;
pub mod class_file;
pub mod cli;
pub mod config;
pub mod constant_pool;
pub mod descriptor;
pub mod duplicates;
pub mod entry;
pub mod error;
pub mod manifest;
pub mod reader;
pub mod references;
pub mod resolver;
pub mod scan;
pub mod session;
pub mod system;

#[cfg(test)]
mod test_utils;
