use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

use crate::config::OutputFormat;
use crate::core::triple::{Literal, RdfTriple, Resource, Term};
use crate::core::vocab::rdf;
use crate::error::ConversionError;
use crate::utils::RdfSerializer;

/// Destination for built triples.
pub trait GraphSink {
    /// Adds a triple; returns `false` when it was already present.
    fn add(&mut self, triple: RdfTriple) -> bool;

    /// Writes the whole graph to `target` in `format`.
    fn serialize(&self, target: &Path, format: &OutputFormat) -> Result<(), ConversionError>;
}

/// In-memory graph with set semantics and sorted iteration.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    triples: BTreeSet<RdfTriple>,
    prefixes: BTreeMap<String, String>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prefix used to compact IRIs in serialized output.
    pub fn bind(&mut self, prefix: &str, namespace: &str) {
        self.prefixes.insert(prefix.to_string(), namespace.to_string());
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &RdfTriple) -> bool {
        self.triples.contains(triple)
    }

    pub fn triples(&self) -> impl Iterator<Item = &RdfTriple> {
        self.triples.iter()
    }

    pub fn has_subject(&self, subject: &Resource) -> bool {
        self.triples.iter().any(|t| &t.subject == subject)
    }

    pub fn add_triples<I: IntoIterator<Item = RdfTriple>>(&mut self, triples: I) -> usize {
        let mut added_count = 0;
        for triple in triples {
            if self.add(triple) {
                added_count += 1;
            }
        }
        added_count
    }

    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&Resource> {
        let mut entities: Vec<&Resource> = self
            .triples
            .iter()
            .filter(|t| t.predicate.as_str() == rdf::TYPE)
            .filter(|t| t.object.as_resource().map(Resource::as_str) == Some(entity_type))
            .map(|t| &t.subject)
            .collect();
        entities.dedup();
        entities
    }

    pub fn get_entity_properties(&self, entity: &Resource) -> BTreeMap<&Resource, Vec<&Term>> {
        let mut properties: BTreeMap<&Resource, Vec<&Term>> = BTreeMap::new();
        for triple in self.triples.iter().filter(|t| &t.subject == entity) {
            properties.entry(&triple.predicate).or_default().push(&triple.object);
        }
        properties
    }

    pub fn get_statistics(&self) -> KnowledgeGraphStats {
        let mut unique_subjects = HashSet::new();
        let mut unique_predicates = HashSet::new();
        let mut unique_objects = HashSet::new();
        let mut predicate_counts: BTreeMap<String, usize> = BTreeMap::new();

        for triple in &self.triples {
            unique_subjects.insert(&triple.subject);
            unique_predicates.insert(&triple.predicate);
            unique_objects.insert(&triple.object);
            *predicate_counts.entry(local_name(triple.predicate.as_str()).to_string()).or_default() += 1;
        }

        let mut predicate_counts: Vec<(String, usize)> = predicate_counts.into_iter().collect();
        predicate_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        KnowledgeGraphStats {
            total_triples: self.triples.len(),
            unique_subjects: unique_subjects.len(),
            unique_predicates: unique_predicates.len(),
            unique_objects: unique_objects.len(),
            predicate_counts,
        }
    }

    /// Loads a Turtle or N-Triples file (chosen by extension) through rio.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        use rio_api::model::{Literal as RioLiteral, Subject, Term as RioTerm};
        use rio_api::parser::TriplesParser;
        use rio_turtle::{NTriplesParser, TurtleError, TurtleParser};

        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open graph file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let mut graph = Self::new();
        let mut skipped = 0usize;

        let mut on_triple = |t: rio_api::model::Triple<'_>| -> Result<(), TurtleError> {
            let subject = match t.subject {
                Subject::NamedNode(n) => Resource::new(n.iri),
                _ => {
                    skipped += 1;
                    return Ok(());
                }
            };
            let object = match t.object {
                RioTerm::NamedNode(n) => Term::Resource(Resource::new(n.iri)),
                RioTerm::Literal(RioLiteral::Simple { value }) => Term::Literal(Literal::plain(value)),
                RioTerm::Literal(RioLiteral::LanguageTaggedString { value, language }) => {
                    Term::Literal(Literal::lang(value, language))
                }
                RioTerm::Literal(RioLiteral::Typed { value, datatype }) => {
                    Term::Literal(Literal::typed(value, datatype.iri))
                }
                _ => {
                    skipped += 1;
                    return Ok(());
                }
            };
            graph.add(RdfTriple::new(subject, Resource::new(t.predicate.iri), object));
            Ok(())
        };

        let is_ntriples = path.extension().and_then(|e| e.to_str()) == Some("nt");
        if is_ntriples {
            NTriplesParser::new(reader).parse_all(&mut on_triple)
        } else {
            TurtleParser::new(reader, None).parse_all(&mut on_triple)
        }
        .with_context(|| format!("Failed to parse graph file: {}", path.display()))?;

        if skipped > 0 {
            debug!("Skipped {} triples with blank nodes or quoted triples", skipped);
        }
        info!("Loaded {} triples from: {}", graph.len(), path.display());
        Ok(graph)
    }
}

impl GraphSink for KnowledgeGraph {
    fn add(&mut self, triple: RdfTriple) -> bool {
        debug!("Added triple: {}", triple.to_ntriple());
        self.triples.insert(triple)
    }

    fn serialize(&self, target: &Path, format: &OutputFormat) -> Result<(), ConversionError> {
        let sink_error = |source: std::io::Error| ConversionError::SinkWrite {
            target: target.to_path_buf(),
            source,
        };

        let content = RdfSerializer::new()
            .serialize(self, format)
            .map_err(|e| sink_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;

        fs::write(target, content).map_err(sink_error)?;

        info!("Knowledge graph exported to: {} (format: {:?})", target.display(), format);
        Ok(())
    }
}

/// The part of an IRI after the last `/` or `#`.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['/', '#']).next().unwrap_or(iri)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraphStats {
    pub total_triples: usize,
    pub unique_subjects: usize,
    pub unique_predicates: usize,
    pub unique_objects: usize,
    /// Predicate local names with their usage counts, most used first.
    pub predicate_counts: Vec<(String, usize)>,
}

impl std::fmt::Display for KnowledgeGraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "Knowledge Graph Statistics:\n\
             Total Triples: {}\n\
             Unique Subjects: {}\n\
             Unique Predicates: {}\n\
             Unique Objects: {}",
            self.total_triples,
            self.unique_subjects,
            self.unique_predicates,
            self.unique_objects
        )?;

        if !self.predicate_counts.is_empty() {
            write!(f, "\nPredicates used:")?;
            for (name, count) in &self.predicate_counts {
                write!(f, "\n  {}: {}", name, count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vocab::{foaf, schema};

    fn triple(s: &str, p: &str, o: Term) -> RdfTriple {
        RdfTriple::new(Resource::new(s), Resource::new(p), o)
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut graph = KnowledgeGraph::new();
        let t = triple("http://example.org/a", foaf::NAME, Literal::lang("A", "en").into());

        assert!(graph.add(t.clone()));
        assert!(!graph.add(t));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_statistics_and_types() {
        let mut graph = KnowledgeGraph::new();
        graph.add(triple("http://example.org/p1", rdf::TYPE, Resource::new(foaf::PERSON).into()));
        graph.add(triple("http://example.org/p2", rdf::TYPE, Resource::new(foaf::PERSON).into()));
        graph.add(triple("http://example.org/p1", foaf::NAME, Literal::plain("One").into()));
        graph.add(triple("http://example.org/d", schema::MENTIONS, Resource::new("http://example.org/p1").into()));

        let stats = graph.get_statistics();
        assert_eq!(stats.total_triples, 4);
        assert_eq!(stats.unique_subjects, 3);
        assert_eq!(stats.unique_predicates, 3);
        assert_eq!(stats.predicate_counts[0], ("type".to_string(), 2));

        assert_eq!(graph.get_entities_by_type(foaf::PERSON).len(), 2);
        assert_eq!(graph.get_entity_properties(&Resource::new("http://example.org/p1")).len(), 2);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("http://purl.org/dc/terms/creator"), "creator");
        assert_eq!(local_name("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"), "type");
    }

    #[test]
    fn test_serialize_empty_graph_and_unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        let graph = KnowledgeGraph::new();

        let target = dir.path().join("empty.ttl");
        assert!(graph.serialize(&target, &OutputFormat::Turtle).is_ok());
        assert!(target.exists());

        let bad = dir.path().join("missing_dir").join("out.rdf");
        let err = graph.serialize(&bad, &OutputFormat::RdfXml).unwrap_err();
        assert!(matches!(err, ConversionError::SinkWrite { .. }));
    }

    #[test]
    fn test_load_turtle_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.ttl");
        fs::write(
            &path,
            "@prefix ex: <http://example.org/> .\nex:a ex:b \"c\"@en , 5 .\n_:x ex:b ex:a .\n",
        )
        .unwrap();

        let graph = KnowledgeGraph::load_from_file(&path).unwrap();
        assert_eq!(graph.len(), 2);
    }
}
