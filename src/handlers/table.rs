use std::path::{Path, PathBuf};

use crate::error::ConversionError;
use crate::handlers::read_text;

/// A parsed table: header names plus one entry per data row. Rows the CSV
/// reader could not parse are kept as errors so they can be skipped one by one.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Result<Vec<String>, String>>,
}

impl Table {
    pub fn parse(content: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(|cell| cell.to_string()).collect())
                    .map_err(|e| e.to_string())
            })
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Something that can produce a [`Table`]: a file on disk, or text already in memory.
pub trait TableSource {
    fn name(&self) -> String;
    fn load(&self) -> Result<Table, ConversionError>;
}

pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvFile {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn load(&self) -> Result<Table, ConversionError> {
        let content = read_text(&self.path)?;
        Table::parse(&content).map_err(|e| ConversionError::SourceUnreadable {
            source_name: self.name(),
            reason: e.to_string(),
        })
    }
}

pub struct CsvText {
    name: String,
    content: String,
}

impl CsvText {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl TableSource for CsvText {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<Table, ConversionError> {
        Table::parse(&self.content).map_err(|e| ConversionError::SourceUnreadable {
            source_name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}
