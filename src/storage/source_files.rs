//! Submitted source files

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    constants::{languages, SOURCE_FILE_STEM},
    error::AppResult,
};

/// Writes and reads `{root}/{submission_id}/main{ext}`
#[derive(Debug, Clone)]
pub struct SourceFileStore {
    root: PathBuf,
}

impl SourceFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory receiving the files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the source of a new submission and return its stored handle
    pub async fn write(
        &self,
        submission_id: Uuid,
        language_id: i32,
        source_code: &str,
    ) -> AppResult<String> {
        let dir = self.root.join(submission_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!(
            "{}{}",
            SOURCE_FILE_STEM,
            languages::extension_for(language_id)
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, source_code).await?;

        tracing::debug!(submission_id = %submission_id, path = %path.display(), "Stored source file");

        Ok(format!("/{}", path.display()))
    }

    /// Read a source file back from its stored handle
    pub async fn read(&self, handle: &str) -> AppResult<String> {
        let path = handle_to_path(handle);
        let source = tokio::fs::read_to_string(path).await?;
        Ok(source)
    }
}

/// Strip the leading `/` added when the handle was stored
fn handle_to_path(handle: &str) -> &Path {
    Path::new(handle.strip_prefix('/').unwrap_or(handle))
}

/// File name component of a stored handle ("main.py")
pub fn file_name(handle: &str) -> String {
    handle_to_path(handle)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| SOURCE_FILE_STEM.to_string())
}

/// Content type used when serving a source file for review
pub fn content_type_for(handle: &str) -> &'static str {
    match handle_to_path(handle).extension().and_then(|ext| ext.to_str()) {
        Some("py") => "text/x-python; charset=utf-8",
        Some("c") => "text/x-c; charset=utf-8",
        Some("cpp") => "text/x-c++src; charset=utf-8",
        _ => "text/plain; charset=utf-8",
    }
}

/// Deflate a single file into an in-memory zip archive
pub fn zip_single_file(name: &str, contents: &[u8]) -> AppResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(name, options)?;
    writer.write_all(contents)?;

    Ok(writer.finish()?.into_inner())
}
