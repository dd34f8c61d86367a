use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::core::terms::{CellValue, Classifier, NamespaceTable};
use crate::core::triple::{RdfTriple, Term};
use crate::core::vocab;
use crate::error::ConversionError;
use crate::handlers::{Table, TableSource};
use crate::knowledge_graph::{GraphSink, KnowledgeGraph};

pub const REQUIRED_COLUMNS: [&str; 3] = ["Subject", "Property", "Object"];

/// Result of converting one row: the triple, or why the row was skipped.
pub type RowOutcome = Result<RdfTriple, ConversionError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Processed,
    Unreadable { reason: String },
    SchemaInvalid { missing: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub triples_added: usize,
    pub rows_skipped: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SourceReport {
    fn skipped(source: String, error: &ConversionError) -> Self {
        let status = match error {
            ConversionError::SourceSchemaInvalid { missing, .. } => SourceStatus::SchemaInvalid {
                missing: missing.clone(),
            },
            other => SourceStatus::Unreadable {
                reason: other.to_string(),
            },
        };
        Self {
            source,
            status,
            triples_added: 0,
            rows_skipped: 0,
            errors: vec![error.to_string()],
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == SourceStatus::Processed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub processing_time_seconds: f64,
    pub sources: Vec<SourceReport>,
    pub total_triples: usize,
}

impl BatchReport {
    pub fn loaded_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_loaded()).count()
    }

    pub fn skipped_sources(&self) -> usize {
        self.sources.len() - self.loaded_sources()
    }

    pub fn skipped_rows(&self) -> usize {
        self.sources.iter().map(|s| s.rows_skipped).sum()
    }
}

/// How the Object column's cells are typed, inferred per source the way a
/// dataframe loader would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn infer<'a, I: IntoIterator<Item = &'a str>>(cells: I) -> Self {
        let mut kind = ColumnKind::Integer;
        let mut seen = false;

        for cell in cells.into_iter().filter(|c| !c.trim().is_empty()) {
            seen = true;
            if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
                kind = ColumnKind::Float;
            }
            if kind == ColumnKind::Float && cell.parse::<f64>().is_err() {
                return ColumnKind::Text;
            }
        }

        if seen { kind } else { ColumnKind::Text }
    }

    pub fn cell_value(self, raw: &str) -> CellValue {
        match self {
            ColumnKind::Integer if raw.trim().parse::<i64>().is_ok() => CellValue::Integer(raw.to_string()),
            ColumnKind::Float if raw.trim().parse::<f64>().is_ok() => CellValue::Float(raw.to_string()),
            ColumnKind::Integer | ColumnKind::Float => raw.into(),
            ColumnKind::Text => raw.into(),
        }
    }
}

struct Columns {
    subject: usize,
    property: usize,
    object: usize,
}

impl Columns {
    fn locate(table: &Table, source_name: &str) -> Result<Self, ConversionError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| table.column(name).is_none())
            .map(|name| name.to_string())
            .collect();

        match (table.column("Subject"), table.column("Property"), table.column("Object")) {
            (Some(subject), Some(property), Some(object)) => Ok(Self {
                subject,
                property,
                object,
            }),
            _ => Err(ConversionError::SourceSchemaInvalid {
                source_name: source_name.to_string(),
                missing,
            }),
        }
    }
}

fn required_cell<'a>(cells: &'a [String], row: usize, index: usize, name: &str) -> Result<&'a str, ConversionError> {
    match cells.get(index) {
        Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
        Some(_) => Err(ConversionError::row(row, format!("empty {} cell", name))),
        None => Err(ConversionError::row(row, format!("missing {} cell", name))),
    }
}

/// Turns (Subject, Property, Object) tables into triples.
pub struct TabularTripleBuilder {
    namespaces: NamespaceTable,
    classifier: Classifier,
    fail_on_empty_batch: bool,
}

impl TabularTripleBuilder {
    pub fn new(namespaces: NamespaceTable, classifier: Classifier) -> Self {
        Self {
            namespaces,
            classifier,
            fail_on_empty_batch: false,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(NamespaceTable::from_settings(&config.namespaces), Classifier::default())
            .with_fail_on_empty_batch(config.tabular.fail_on_empty_batch)
    }

    pub fn with_fail_on_empty_batch(mut self, fail: bool) -> Self {
        self.fail_on_empty_batch = fail;
        self
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Binds the namespace table's prefixes (and `xsd`) for readable output.
    pub fn bind_prefixes(&self, graph: &mut KnowledgeGraph) {
        for (prefix, namespace) in self.namespaces.bindings() {
            graph.bind(&prefix, &namespace);
        }
        graph.bind("xsd", vocab::XSD);
    }

    /// Converts one data row. `row` is the 0-based data row index.
    pub fn convert_row(&self, row: usize, cells: &[String], object_kind: ColumnKind) -> RowOutcome {
        self.convert_cells(row, cells, &Columns { subject: 0, property: 1, object: 2 }, object_kind)
    }

    fn convert_cells(&self, row: usize, cells: &[String], columns: &Columns, object_kind: ColumnKind) -> RowOutcome {
        let subject = self.namespaces.mint_reference(required_cell(cells, row, columns.subject, "Subject")?);
        let predicate = self
            .namespaces
            .resolve_predicate(required_cell(cells, row, columns.property, "Property")?);
        let value = object_kind.cell_value(required_cell(cells, row, columns.object, "Object")?);
        let object = self.classifier.classify_object(&value, &self.namespaces);

        let base = self.namespaces.default_base();
        if subject.as_str() == base {
            return Err(ConversionError::row(row, "Subject has no URI-safe characters"));
        }
        if predicate.as_str() == base {
            return Err(ConversionError::row(row, "Property has no local name"));
        }
        if let Term::Resource(r) = &object {
            if r.as_str() == base {
                return Err(ConversionError::row(row, "Object has no URI-safe characters"));
            }
        }

        Ok(RdfTriple::new(subject, predicate, object))
    }

    /// Loads one source and adds its rows to `sink`. Source-level failures
    /// skip the whole source; row failures skip only the row.
    pub fn process_source<S: GraphSink + ?Sized>(&self, source: &dyn TableSource, sink: &mut S) -> SourceReport {
        let name = source.name();
        info!("Processing: {}", name);

        let table = match source.load() {
            Ok(table) => table,
            Err(e) => {
                warn!("Could not read file {}: {}", name, e);
                return SourceReport::skipped(name, &e);
            }
        };

        let columns = match Columns::locate(&table, &name) {
            Ok(columns) => columns,
            Err(e) => {
                warn!("{}", e);
                return SourceReport::skipped(name, &e);
            }
        };

        let object_kind = ColumnKind::infer(table.rows.iter().filter_map(|row| {
            row.as_ref().ok().and_then(|cells| cells.get(columns.object)).map(String::as_str)
        }));
        debug!("Object column of {} inferred as {:?}", name, object_kind);

        let mut report = SourceReport {
            source: name,
            status: SourceStatus::Processed,
            triples_added: 0,
            rows_skipped: 0,
            errors: Vec::new(),
        };

        for (index, record) in table.rows.iter().enumerate() {
            let outcome = match record {
                Ok(cells) => self.convert_cells(index, cells, &columns, object_kind),
                Err(reason) => Err(ConversionError::row(index, reason.clone())),
            };

            match outcome {
                Ok(triple) => {
                    sink.add(triple);
                    report.triples_added += 1;
                }
                Err(e) => {
                    warn!("Error processing {} {}", report.source, e);
                    report.rows_skipped += 1;
                    report.errors.push(e.to_string());
                }
            }
        }

        info!("Successfully added {} triples from {}", report.triples_added, report.source);
        report
    }

    pub fn build<S: GraphSink + ?Sized>(
        &self,
        sources: &[Box<dyn TableSource>],
        sink: &mut S,
    ) -> Result<BatchReport, ConversionError> {
        self.build_with(sources, sink, |_| {})
    }

    /// Processes every source in order, calling `on_source` after each one.
    pub fn build_with<S, F>(
        &self,
        sources: &[Box<dyn TableSource>],
        sink: &mut S,
        mut on_source: F,
    ) -> Result<BatchReport, ConversionError>
    where
        S: GraphSink + ?Sized,
        F: FnMut(&SourceReport),
    {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let mut reports = Vec::with_capacity(sources.len());

        for source in sources {
            let report = self.process_source(source.as_ref(), &mut *sink);
            on_source(&report);
            reports.push(report);
        }

        let report = BatchReport {
            started_at,
            processing_time_seconds: start_time.elapsed().as_secs_f64(),
            total_triples: reports.iter().map(|r| r.triples_added).sum(),
            sources: reports,
        };

        info!(
            "Conversion complete: {} triples from {} of {} sources",
            report.total_triples,
            report.loaded_sources(),
            report.sources.len()
        );

        if report.loaded_sources() == 0 {
            if self.fail_on_empty_batch {
                return Err(ConversionError::NoSourcesLoaded);
            }
            warn!("No source could be loaded; the output graph will be empty");
        }

        Ok(report)
    }
}
