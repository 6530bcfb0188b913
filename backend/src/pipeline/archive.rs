use crate::pipeline::error::{PipelineError, Result};
use common::model::record::GenerationId;
use log::debug;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Longest recipient label kept in a file name, in characters.
pub const MAX_LABEL_CHARS: usize = 60;

const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Makes a recipient label safe to use as part of a file name.
///
/// Removes path separators, reserved and control characters, turns every run of
/// whitespace into one `_` and caps the length. Falls back to `document`.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| !c.is_control() && !UNSAFE_CHARS.contains(c))
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let capped: String = joined.chars().take(MAX_LABEL_CHARS).collect();
    let trimmed = capped.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `{sanitizedRecipient}_{id}.{ext}`. The ID keeps names unique when labels repeat.
pub fn entry_name(label: &str, id: &GenerationId, extension: &str) -> String {
    format!("{}_{}.{}", sanitize_label(label), id, extension)
}

/// Collects per-row files and writes them into one zip archive.
///
/// Entries are kept uncompressed in memory until [`ArchiveBuilder::finalize`],
/// which does all the compression work and reports progress as it goes.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
    names: HashSet<String>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Result<()> {
        let filename = filename.into();
        if !self.names.insert(filename.clone()) {
            return Err(PipelineError::DuplicateEntry(filename));
        }
        self.entries.push((filename, bytes));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compresses every entry and returns the archive bytes.
    ///
    /// `on_progress` receives a percentage in `0.0..=100.0` after each entry
    /// and always ends with `100.0`.
    pub fn finalize(self, mut on_progress: impl FnMut(f32)) -> Result<Vec<u8>> {
        let total = self.entries.len();
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        on_progress(0.0);
        for (done, (name, bytes)) in self.entries.into_iter().enumerate() {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&bytes)?;
            debug!("archived {} ({} bytes)", name, bytes.len());
            on_progress((done + 1) as f32 / total as f32 * 100.0);
        }
        let cursor = writer.finish()?;
        if total == 0 {
            on_progress(100.0);
        }
        Ok(cursor.into_inner())
    }
}
