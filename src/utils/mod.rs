pub mod serialization;

pub use serialization::{escape_iri, validate_rdf_triples, RdfSerializer};
