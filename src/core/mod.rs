pub mod document;
pub mod tabular;
pub mod terms;
pub mod triple;
pub mod vocab;

pub use document::{DocumentStats, DocumentTripleBuilder};
pub use tabular::{BatchReport, ColumnKind, RowOutcome, SourceReport, SourceStatus, TabularTripleBuilder};
pub use terms::{CellValue, Classification, ClassificationRule, Classifier, NamespaceTable};
pub use triple::{Literal, RdfTriple, Resource, Term};
