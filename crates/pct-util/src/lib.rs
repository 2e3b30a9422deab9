#![forbid(unsafe_code)]
//! Filesystem, process, download, and encoding helpers for the plugin compatibility tester.

pub mod compress;
pub mod download;
pub mod error;
pub mod fs;
pub mod process;
