//! File storage
//!
//! Submitted source files and test-case assets live on a shared filesystem.
//! Database rows refer to them through `/`-prefixed handles.

pub mod case_assets;
pub mod source_files;

pub use case_assets::{CaseAssetStore, FsCaseAssetStore};
pub use source_files::SourceFileStore;

use std::path::{Path, PathBuf};

/// Resolve a `/`-prefixed handle against a storage root
pub fn resolve_handle(root: &Path, handle: &str) -> PathBuf {
    root.join(handle.trim_start_matches('/'))
}
