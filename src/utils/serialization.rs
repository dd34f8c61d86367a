use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::OutputFormat;
use crate::core::triple::{escape_literal, Literal, RdfTriple, Resource, Term};
use crate::core::vocab::{self, rdf};
use crate::knowledge_graph::KnowledgeGraph;

static TURTLE_LOCAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]([A-Za-z0-9_.\-]*[A-Za-z0-9_\-])?$").expect("static pattern")
});

static XML_NCNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("static pattern"));

pub struct RdfSerializer;

impl Default for RdfSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl RdfSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, graph: &KnowledgeGraph, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Turtle => Ok(self.serialize_turtle(graph)),
            OutputFormat::NTriples => self.serialize_ntriples(graph),
            OutputFormat::RdfXml => self.serialize_rdf_xml(graph),
            OutputFormat::JsonLd => self.serialize_json_ld(graph),
        }
    }

    fn serialize_turtle(&self, graph: &KnowledgeGraph) -> String {
        let prefixes = graph.prefixes();
        let mut output = String::new();

        for (prefix, namespace) in prefixes {
            output.push_str(&format!("@prefix {}: <{}> .\n", prefix, escape_iri(namespace)));
        }
        if !prefixes.is_empty() {
            output.push('\n');
        }

        let mut current_subject: Option<&Resource> = None;
        for triple in graph.triples() {
            let predicate = if triple.predicate.as_str() == rdf::TYPE {
                "a".to_string()
            } else {
                self.format_uri_for_turtle(triple.predicate.as_str(), prefixes)
            };
            let object = self.format_object_for_turtle(&triple.object, prefixes);

            if current_subject == Some(&triple.subject) {
                output.push_str(&format!(" ;\n    {} {}", predicate, object));
            } else {
                if current_subject.is_some() {
                    output.push_str(" .\n\n");
                }
                let subject = self.format_uri_for_turtle(triple.subject.as_str(), prefixes);
                output.push_str(&format!("{} {} {}", subject, predicate, object));
                current_subject = Some(&triple.subject);
            }
        }
        if current_subject.is_some() {
            output.push_str(" .\n");
        }

        output
    }

    fn serialize_ntriples(&self, graph: &KnowledgeGraph) -> Result<String> {
        use rio_api::formatter::TriplesFormatter;
        use rio_api::model::{Literal as RioLiteral, NamedNode, Subject, Term as RioTerm, Triple};
        use rio_turtle::NTriplesFormatter;

        let mut formatter = NTriplesFormatter::new(Vec::new());

        for triple in graph.triples() {
            let subject = escape_iri(triple.subject.as_str());
            let predicate = escape_iri(triple.predicate.as_str());
            let object_iri;
            let object = match &triple.object {
                Term::Resource(r) => {
                    object_iri = escape_iri(r.as_str());
                    RioTerm::NamedNode(NamedNode { iri: &object_iri })
                }
                Term::Literal(Literal::Plain { value }) => RioTerm::Literal(RioLiteral::Simple { value }),
                Term::Literal(Literal::Language { value, language }) => {
                    RioTerm::Literal(RioLiteral::LanguageTaggedString { value, language })
                }
                Term::Literal(Literal::Typed { value, datatype }) => RioTerm::Literal(RioLiteral::Typed {
                    value,
                    datatype: NamedNode { iri: datatype.as_str() },
                }),
            };

            formatter
                .format(&Triple {
                    subject: Subject::NamedNode(NamedNode { iri: &subject }),
                    predicate: NamedNode { iri: &predicate },
                    object,
                })
                .context("Failed to format N-Triples")?;
        }

        let bytes = formatter.finish().context("Failed to finish N-Triples output")?;
        String::from_utf8(bytes).context("N-Triples output is not UTF-8")
    }

    fn serialize_rdf_xml(&self, graph: &KnowledgeGraph) -> Result<String> {
        // Predicates become element names, so each one needs a namespace split.
        let mut namespaces: BTreeMap<String, String> = BTreeMap::new();
        namespaces.insert(vocab::RDF.to_string(), "rdf".to_string());
        let mut qnames: BTreeMap<&str, String> = BTreeMap::new();

        for triple in graph.triples() {
            let iri = triple.predicate.as_str();
            if qnames.contains_key(iri) {
                continue;
            }
            let (namespace, local) = split_predicate(iri)
                .with_context(|| format!("Predicate cannot be written as an XML element: {}", iri))?;

            if !namespaces.contains_key(namespace) {
                let bound = graph
                    .prefixes()
                    .iter()
                    .find(|(prefix, ns)| {
                        ns.as_str() == namespace
                            && prefix.as_str() != "rdf"
                            && !prefix.to_lowercase().starts_with("xml")
                            && XML_NCNAME.is_match(prefix)
                            && !namespaces.values().any(|p| p == *prefix)
                    })
                    .map(|(prefix, _)| prefix.clone());
                let prefix = bound.unwrap_or_else(|| format!("ns{}", namespaces.len()));
                namespaces.insert(namespace.to_string(), prefix);
            }
            qnames.insert(iri, format!("{}:{}", namespaces[namespace], local));
        }

        let mut output = String::new();
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        output.push_str("<rdf:RDF");
        let mut declarations: Vec<(&String, &String)> = namespaces.iter().map(|(ns, p)| (p, ns)).collect();
        declarations.sort();
        for (prefix, namespace) in declarations {
            output.push_str(&format!(
                "\n   xmlns:{}=\"{}\"",
                prefix,
                html_escape::encode_double_quoted_attribute(namespace)
            ));
        }
        output.push_str(">\n");

        let mut current_subject: Option<&Resource> = None;
        for triple in graph.triples() {
            if current_subject != Some(&triple.subject) {
                if current_subject.is_some() {
                    output.push_str("  </rdf:Description>\n");
                }
                output.push_str(&format!(
                    "  <rdf:Description rdf:about=\"{}\">\n",
                    html_escape::encode_double_quoted_attribute(triple.subject.as_str())
                ));
                current_subject = Some(&triple.subject);
            }

            let element = &qnames[triple.predicate.as_str()];
            match &triple.object {
                Term::Resource(r) => output.push_str(&format!(
                    "    <{} rdf:resource=\"{}\"/>\n",
                    element,
                    html_escape::encode_double_quoted_attribute(r.as_str())
                )),
                Term::Literal(Literal::Plain { value }) => output.push_str(&format!(
                    "    <{}>{}</{}>\n",
                    element,
                    html_escape::encode_text(value),
                    element
                )),
                Term::Literal(Literal::Language { value, language }) => output.push_str(&format!(
                    "    <{} xml:lang=\"{}\">{}</{}>\n",
                    element,
                    html_escape::encode_double_quoted_attribute(language),
                    html_escape::encode_text(value),
                    element
                )),
                Term::Literal(Literal::Typed { value, datatype }) => output.push_str(&format!(
                    "    <{} rdf:datatype=\"{}\">{}</{}>\n",
                    element,
                    html_escape::encode_double_quoted_attribute(datatype.as_str()),
                    html_escape::encode_text(value),
                    element
                )),
            }
        }
        if current_subject.is_some() {
            output.push_str("  </rdf:Description>\n");
        }

        output.push_str("</rdf:RDF>\n");
        Ok(output)
    }

    fn serialize_json_ld(&self, graph: &KnowledgeGraph) -> Result<String> {
        let mut context = serde_json::Map::new();
        for (prefix, namespace) in graph.prefixes() {
            context.insert(prefix.clone(), serde_json::Value::String(namespace.clone()));
        }

        let mut subjects: BTreeMap<&str, serde_json::Map<String, serde_json::Value>> = BTreeMap::new();
        for triple in graph.triples() {
            let subject_entry = subjects.entry(triple.subject.as_str()).or_insert_with(|| {
                let mut map = serde_json::Map::new();
                map.insert("@id".to_string(), serde_json::Value::String(triple.subject.as_str().to_string()));
                map
            });

            let predicate_key = if triple.predicate.as_str() == rdf::TYPE {
                "@type".to_string()
            } else {
                compact(triple.predicate.as_str(), graph.prefixes())
            };

            let object_value = match (&triple.object, predicate_key.as_str()) {
                (Term::Resource(r), "@type") => serde_json::Value::String(r.as_str().to_string()),
                (Term::Resource(r), _) => serde_json::json!({ "@id": r.as_str() }),
                (Term::Literal(Literal::Plain { value }), _) => serde_json::Value::String(value.clone()),
                (Term::Literal(Literal::Language { value, language }), _) => {
                    serde_json::json!({ "@value": value, "@language": language })
                }
                (Term::Literal(Literal::Typed { value, datatype }), _) => {
                    serde_json::json!({ "@value": value, "@type": datatype.as_str() })
                }
            };

            let values = subject_entry
                .entry(predicate_key)
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            if let serde_json::Value::Array(values) = values {
                values.push(object_value);
            }
        }

        let graph_nodes: Vec<serde_json::Value> =
            subjects.into_values().map(serde_json::Value::Object).collect();

        let json_ld = serde_json::json!({
            "@context": context,
            "@graph": graph_nodes
        });

        serde_json::to_string_pretty(&json_ld)
            .context("Failed to serialize JSON-LD")
    }

    fn format_uri_for_turtle(&self, uri: &str, prefixes: &BTreeMap<String, String>) -> String {
        let best = prefixes
            .iter()
            .filter(|(_, ns)| uri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len());

        if let Some((prefix, namespace)) = best {
            let local = &uri[namespace.len()..];
            if TURTLE_LOCAL.is_match(local) {
                return format!("{}:{}", prefix, local);
            }
        }
        format!("<{}>", escape_iri(uri))
    }

    fn format_object_for_turtle(&self, object: &Term, prefixes: &BTreeMap<String, String>) -> String {
        match object {
            Term::Resource(r) => self.format_uri_for_turtle(r.as_str(), prefixes),
            Term::Literal(Literal::Plain { value }) => format!("\"{}\"", escape_literal(value)),
            Term::Literal(Literal::Language { value, language }) => {
                format!("\"{}\"@{}", escape_literal(value), language)
            }
            Term::Literal(Literal::Typed { value, datatype }) => format!(
                "\"{}\"^^{}",
                escape_literal(value),
                self.format_uri_for_turtle(datatype.as_str(), prefixes)
            ),
        }
    }
}

/// Compacts `iri` with the longest matching prefix, for JSON-LD keys.
fn compact(iri: &str, prefixes: &BTreeMap<String, String>) -> String {
    prefixes
        .iter()
        .filter(|(_, ns)| iri.starts_with(ns.as_str()) && iri.len() > ns.len())
        .max_by_key(|(_, ns)| ns.len())
        .map(|(prefix, ns)| format!("{}:{}", prefix, &iri[ns.len()..]))
        .unwrap_or_else(|| iri.to_string())
}

/// Splits a predicate IRI into namespace and an XML-safe local name.
fn split_predicate(iri: &str) -> Option<(&str, &str)> {
    let split_at = iri.rfind(['/', '#'])? + 1;
    let (namespace, local) = iri.split_at(split_at);
    XML_NCNAME.is_match(local).then_some((namespace, local))
}

/// Percent-encodes the characters that may not appear inside `<...>`.
/// External IRIs are taken as given, so this is the only cleanup they get.
pub fn escape_iri(iri: &str) -> Cow<'_, str> {
    let needs_escape = |c: char| c <= ' ' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\');
    if !iri.chars().any(needs_escape) {
        return Cow::Borrowed(iri);
    }

    let mut out = String::with_capacity(iri.len() + 8);
    for c in iri.chars() {
        if needs_escape(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Reports triples whose IRIs do not parse as absolute URLs or whose literal
/// values are empty. Nothing is rejected; the caller decides what to do.
pub fn validate_rdf_triples<'a, I>(triples: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a RdfTriple>,
{
    let mut issues = Vec::new();

    for (i, triple) in triples.into_iter().enumerate() {
        if url::Url::parse(triple.subject.as_str()).is_err() {
            issues.push(format!("Triple {}: Invalid subject URI: {}", i, triple.subject.as_str()));
        }

        if url::Url::parse(triple.predicate.as_str()).is_err() {
            issues.push(format!("Triple {}: Invalid predicate URI: {}", i, triple.predicate.as_str()));
        }

        match &triple.object {
            Term::Resource(r) if url::Url::parse(r.as_str()).is_err() => {
                issues.push(format!("Triple {}: Invalid object URI: {}", i, r.as_str()));
            }
            Term::Literal(l) if l.value().is_empty() => {
                issues.push(format!("Triple {}: Empty object", i));
            }
            _ => {}
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vocab::{dcterms, xsd};
    use crate::knowledge_graph::GraphSink;
    use rio_api::parser::TriplesParser;
    use rio_turtle::{NTriplesParser, TurtleError, TurtleParser};

    fn sample_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.bind("ex", vocab::LODLAM);
        graph.bind("dcterms", vocab::DCTERMS);
        graph.bind("xsd", vocab::XSD);

        let throne = Resource::new("http://example.org/lodlam/Throne");
        graph.add(RdfTriple::new(
            throne.clone(),
            Resource::new(dcterms::CREATOR),
            Resource::new("http://example.org/lodlam/Qing_Dynasty_Workshop"),
        ));
        graph.add(RdfTriple::new(
            throne.clone(),
            Resource::new("http://example.org/lodlam/height"),
            Literal::plain("85 \"cm\"\nwide"),
        ));
        graph.add(RdfTriple::new(
            throne.clone(),
            Resource::new(rdf::TYPE),
            Resource::new("http://example.org/lodlam/Furniture"),
        ));
        graph.add(RdfTriple::new(
            Resource::new("http://example.org/lodlam/Jewelry."),
            Resource::new("http://example.org/lodlam/count"),
            Literal::integer(3),
        ));
        graph.add(RdfTriple::new(
            Resource::new("https://external.example/objects/a b"),
            Resource::new("http://purl.org/dc/terms/title"),
            Literal::lang("Tower & <Court>", "en"),
        ));
        graph
    }

    fn count_parsed<P: TriplesParser<Error = TurtleError>>(mut parser: P) -> usize {
        let mut count = 0;
        parser
            .parse_all(&mut |_| {
                count += 1;
                Ok(()) as Result<(), TurtleError>
            })
            .unwrap();
        count
    }

    #[test]
    fn test_turtle_reparses() {
        let turtle = RdfSerializer::new().serialize(&sample_graph(), &OutputFormat::Turtle).unwrap();

        assert!(turtle.contains("@prefix dcterms: <http://purl.org/dc/terms/> ."));
        assert!(turtle.contains("ex:Throne"));
        assert!(turtle.contains(" a ex:Furniture"));
        assert!(turtle.contains("<http://example.org/lodlam/Jewelry.>"));
        assert!(turtle.contains("\"3\"^^xsd:integer"));
        assert!(turtle.contains("<https://external.example/objects/a%20b>"));

        assert_eq!(count_parsed(TurtleParser::new(turtle.as_bytes(), None)), 5);
    }

    #[test]
    fn test_ntriples_reparses() {
        let nt = RdfSerializer::new().serialize(&sample_graph(), &OutputFormat::NTriples).unwrap();

        assert_eq!(nt.lines().count(), 5);
        assert!(nt.contains(&format!("\"3\"^^<{}>", xsd::INTEGER)));
        assert_eq!(count_parsed(NTriplesParser::new(nt.as_bytes())), 5);
    }

    #[test]
    fn test_rdf_xml_layout() {
        let xml = RdfSerializer::new().serialize(&sample_graph(), &OutputFormat::RdfXml).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:dcterms=\"http://purl.org/dc/terms/\""));
        assert!(xml.contains("<dcterms:creator rdf:resource=\"http://example.org/lodlam/Qing_Dynasty_Workshop\"/>"));
        assert!(xml.contains("<dcterms:title xml:lang=\"en\">Tower &amp; &lt;Court&gt;</dcterms:title>"));
        assert!(xml.contains(&format!("<ex:count rdf:datatype=\"{}\">3</ex:count>", xsd::INTEGER)));
        assert_eq!(xml.matches("<rdf:Description").count(), 3);
    }

    #[test]
    fn test_rdf_xml_rejects_unsplittable_predicate() {
        let mut graph = KnowledgeGraph::new();
        graph.add(RdfTriple::new(
            Resource::new("http://example.org/a"),
            Resource::new("http://example.org/1st"),
            Literal::plain("x"),
        ));

        assert!(RdfSerializer::new().serialize(&graph, &OutputFormat::RdfXml).is_err());
    }

    #[test]
    fn test_json_ld_groups_by_subject() {
        let json = RdfSerializer::new().serialize(&sample_graph(), &OutputFormat::JsonLd).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let nodes = value["@graph"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        let throne = nodes
            .iter()
            .find(|n| n["@id"] == "http://example.org/lodlam/Throne")
            .unwrap();
        assert_eq!(throne["dcterms:creator"][0]["@id"], "http://example.org/lodlam/Qing_Dynasty_Workshop");
        assert_eq!(throne["@type"][0], "http://example.org/lodlam/Furniture");
    }

    #[test]
    fn test_validate_rdf_triples() {
        let triples = vec![
            RdfTriple::new(
                Resource::new("http://example.org/person1"),
                Resource::new("http://example.org/hasName"),
                Literal::plain("John Doe"),
            ),
            RdfTriple::new(
                Resource::new("invalid_uri"),
                Resource::new("http://example.org/hasAge"),
                Literal::plain(""),
            ),
        ];

        let issues = validate_rdf_triples(&triples);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("Invalid subject URI"));
        assert!(issues[1].contains("Empty object"));
    }

    #[test]
    fn test_escape_iri() {
        assert_eq!(escape_iri("http://a/b"), "http://a/b");
        assert_eq!(escape_iri("http://a/b c<d>"), "http://a/b%20c%3Cd%3E");
    }
}
