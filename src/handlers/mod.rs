pub mod table;
pub mod tei;

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ConversionError;

pub use table::{CsvFile, CsvText, Table, TableSource};
pub use tei::{Division, Entity, MentionKind, Paragraph, Segment, TeiDocument};

/// Reads a source file into a string, honoring a UTF-8/UTF-16 byte order mark.
pub fn read_text(path: &Path) -> Result<String, ConversionError> {
    let bytes = fs::read(path).map_err(|e| ConversionError::SourceUnreadable {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let (encoding, bom_len) = encoding_rs::Encoding::for_bom(&bytes)
        .unwrap_or((encoding_rs::UTF_8, 0));

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        tracing::warn!("Encoding errors detected in file: {}", path.display());
    }

    Ok(text.into_owned())
}

/// Lists every `.csv` file under `dir`, sorted by path.
pub fn discover_csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();

    files.sort();
    files
}
