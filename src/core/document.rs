//! Maps a parsed TEI document onto Dublin Core, FOAF, schema.org and
//! CIDOC-CRM terms.
//!
//! Every metadata field is optional: a missing title, date or note simply
//! produces fewer triples. Entities declared without an `xml:id` cannot be
//! named and are skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Configuration, DocumentSettings};
use crate::core::terms::sanitize_local_name;
use crate::core::triple::{Literal, RdfTriple, Resource};
use crate::core::vocab::{self, crm, dc, dcterms, foaf, rdf, rdfs, schema};
use crate::handlers::tei::{local_identifier, Division, Entity, TeiDocument};
use crate::knowledge_graph::{GraphSink, KnowledgeGraph};

const LANG: &str = "en";

/// Entity counts of a converted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_triples: usize,
    pub persons: usize,
    pub places: usize,
    pub organizations: usize,
    pub events: usize,
}

impl DocumentStats {
    pub fn from_graph(graph: &KnowledgeGraph) -> Self {
        Self {
            total_triples: graph.len(),
            persons: graph.get_entities_by_type(foaf::PERSON).len(),
            places: graph.get_entities_by_type(schema::PLACE).len(),
            organizations: graph.get_entities_by_type(foaf::ORGANIZATION).len(),
            events: graph.get_entities_by_type(schema::EVENT).len(),
        }
    }
}

impl std::fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total triples: {}\nPersons: {}\nPlaces: {}\nOrganizations: {}\nEvents: {}",
            self.total_triples, self.persons, self.places, self.organizations, self.events
        )
    }
}

pub struct DocumentTripleBuilder {
    settings: DocumentSettings,
}

impl DocumentTripleBuilder {
    pub fn new(settings: DocumentSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.document.clone())
    }

    fn resource(&self, local: &str) -> Resource {
        Resource::in_namespace(&self.settings.base_uri, local)
    }

    /// The document's own resource: configured id, else the minted title.
    pub fn document_resource(&self, document: &TeiDocument) -> Resource {
        let local = self
            .settings
            .document_id
            .clone()
            .or_else(|| document.title.as_deref().map(sanitize_local_name))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "Document".to_string());
        self.resource(&local)
    }

    pub fn bind_prefixes(&self, graph: &mut KnowledgeGraph) {
        graph.bind(&self.settings.prefix, &self.settings.base_uri);
        for (prefix, namespace) in [
            ("dc", vocab::DC),
            ("dcterms", vocab::DCTERMS),
            ("foaf", vocab::FOAF),
            ("schema", vocab::SCHEMA),
            ("skos", vocab::SKOS),
            ("crm", vocab::CRM),
            ("edm", vocab::EDM),
            ("rdf", vocab::RDF),
            ("rdfs", vocab::RDFS),
            ("xsd", vocab::XSD),
        ] {
            graph.bind(prefix, namespace);
        }
    }

    /// Adds every triple for `document` to `graph` and returns the counts.
    pub fn build(&self, document: &TeiDocument, graph: &mut KnowledgeGraph) -> DocumentStats {
        self.bind_prefixes(graph);
        let doc = self.document_resource(document);
        info!("Converting document: {}", doc);

        self.add_metadata(document, &doc, graph);

        for person in &document.persons {
            self.add_entity(person, &doc, &[foaf::PERSON, schema::PERSON, crm::E21_PERSON], graph);
        }
        for place in &document.places {
            if let Some(place_uri) =
                self.add_entity(place, &doc, &[schema::PLACE, crm::E53_PLACE], graph)
            {
                if let Some((lat, lon)) = place.coordinates() {
                    graph.add(RdfTriple::new(place_uri.clone(), Resource::new(schema::LATITUDE), Literal::float(lat)));
                    graph.add(RdfTriple::new(place_uri, Resource::new(schema::LONGITUDE), Literal::float(lon)));
                }
            }
        }
        for org in &document.organizations {
            self.add_entity(
                org,
                &doc,
                &[foaf::ORGANIZATION, schema::ORGANIZATION, crm::E74_GROUP],
                graph,
            );
        }

        for kind in &self.settings.event_division_types {
            for (index, division) in document.divisions_of_kind(kind).into_iter().enumerate() {
                self.add_event_division(kind, index + 1, division, &doc, graph);
            }
        }

        self.add_context(&doc, graph);

        let stats = DocumentStats::from_graph(graph);
        info!("Document converted: {} triples", stats.total_triples);
        stats
    }

    fn add_metadata(&self, document: &TeiDocument, doc: &Resource, graph: &mut KnowledgeGraph) {
        for class in [schema::HISTORICAL_DOCUMENT, foaf::DOCUMENT, crm::E31_DOCUMENT] {
            graph.add(RdfTriple::new(doc.clone(), Resource::new(rdf::TYPE), Resource::new(class)));
        }

        if let Some(title) = &document.title {
            for predicate in [dc::TITLE, dcterms::TITLE] {
                graph.add(RdfTriple::new(doc.clone(), Resource::new(predicate), Literal::lang(title.as_str(), LANG)));
            }
        }

        if let Some(author) = &document.author {
            let local = self.settings.author_id.clone().unwrap_or_else(|| sanitize_local_name(author));
            let author_uri = self.resource(&local);
            graph.add(RdfTriple::new(author_uri.clone(), Resource::new(rdf::TYPE), Resource::new(foaf::ORGANIZATION)));
            graph.add(RdfTriple::new(author_uri.clone(), Resource::new(foaf::NAME), Literal::lang(author.as_str(), LANG)));
            for predicate in [dc::CREATOR, dcterms::CREATOR] {
                graph.add(RdfTriple::new(doc.clone(), Resource::new(predicate), author_uri.clone()));
            }
        }

        if let Some(date) = &document.date {
            for predicate in [dc::DATE, dcterms::CREATED, schema::DATE_CREATED] {
                graph.add(RdfTriple::new(doc.clone(), Resource::new(predicate), Literal::date(date.as_str())));
            }
        }

        if let Some(place) = &document.pub_place {
            let local = self.settings.place_id.clone().unwrap_or_else(|| sanitize_local_name(place));
            let place_uri = self.resource(&local);
            graph.add(RdfTriple::new(place_uri.clone(), Resource::new(rdf::TYPE), Resource::new(schema::PLACE)));
            graph.add(RdfTriple::new(place_uri.clone(), Resource::new(foaf::NAME), Literal::lang(place.as_str(), LANG)));
            graph.add(RdfTriple::new(doc.clone(), Resource::new(schema::LOCATION_CREATED), place_uri));
        }

        if let Some(description) = &document.source_description {
            for predicate in [dc::DESCRIPTION, dcterms::DESCRIPTION] {
                graph.add(RdfTriple::new(doc.clone(), Resource::new(predicate), Literal::lang(description.as_str(), LANG)));
            }
        }

        graph.add(RdfTriple::new(doc.clone(), Resource::new(dc::LANGUAGE), Literal::plain("en")));
        graph.add(RdfTriple::new(doc.clone(), Resource::new(dcterms::LANGUAGE), Literal::plain("eng")));

        for keyword in document.keywords_in_scheme(&self.settings.keyword_scheme) {
            for predicate in [dc::SUBJECT, dcterms::SUBJECT] {
                graph.add(RdfTriple::new(doc.clone(), Resource::new(predicate), Literal::lang(keyword, LANG)));
            }
        }
    }

    /// Types, names and notes a declared entity and links it from the
    /// document. Returns its resource, or `None` when it has no id.
    fn add_entity(
        &self,
        entity: &Entity,
        doc: &Resource,
        classes: &[&str],
        graph: &mut KnowledgeGraph,
    ) -> Option<Resource> {
        let Some(id) = entity.id.as_deref() else {
            debug!("Skipping entity without xml:id: {:?}", entity.name);
            return None;
        };
        let uri = self.resource(id);

        for class in classes {
            graph.add(RdfTriple::new(uri.clone(), Resource::new(rdf::TYPE), Resource::new(*class)));
        }
        if let Some(name) = &entity.name {
            for predicate in [foaf::NAME, rdfs::LABEL, schema::NAME] {
                graph.add(RdfTriple::new(uri.clone(), Resource::new(predicate), Literal::lang(name.as_str(), LANG)));
            }
        }
        if let Some(note) = &entity.note {
            for predicate in [rdfs::COMMENT, schema::DESCRIPTION] {
                graph.add(RdfTriple::new(uri.clone(), Resource::new(predicate), Literal::lang(note.as_str(), LANG)));
            }
        }
        for predicate in [schema::MENTIONS, crm::P67_REFERS_TO] {
            graph.add(RdfTriple::new(doc.clone(), Resource::new(predicate), uri.clone()));
        }

        Some(uri)
    }

    fn add_event_division(
        &self,
        kind: &str,
        position: usize,
        division: &Division,
        doc: &Resource,
        graph: &mut KnowledgeGraph,
    ) {
        let label = event_label(kind, division.number.as_deref(), position);
        let event = self.resource(&label.replace(' ', "_"));
        debug!("Event division: {}", label);

        graph.add(RdfTriple::new(event.clone(), Resource::new(rdf::TYPE), Resource::new(schema::EVENT)));
        graph.add(RdfTriple::new(event.clone(), Resource::new(rdf::TYPE), Resource::new(crm::E5_EVENT)));
        graph.add(RdfTriple::new(event.clone(), Resource::new(rdfs::LABEL), Literal::lang(label.as_str(), LANG)));

        let description: String = division
            .paragraph_text()
            .chars()
            .take(self.settings.description_limit)
            .collect();
        graph.add(RdfTriple::new(event.clone(), Resource::new(schema::DESCRIPTION), Literal::lang(description, LANG)));

        graph.add(RdfTriple::new(doc.clone(), Resource::new(schema::ABOUT), event.clone()));
        graph.add(RdfTriple::new(event.clone(), Resource::new(schema::IS_PART_OF), doc.clone()));

        for person_id in &division.person_refs {
            let person = self.resource(person_id);
            graph.add(RdfTriple::new(event.clone(), Resource::new(schema::ACTOR), person.clone()));
            graph.add(RdfTriple::new(event.clone(), Resource::new(crm::P11_HAD_PARTICIPANT), person));
        }
    }

    fn add_context(&self, doc: &Resource, graph: &mut KnowledgeGraph) {
        for context in &self.settings.context_events {
            let event = self.resource(&context.id);
            graph.add(RdfTriple::new(event.clone(), Resource::new(rdf::TYPE), Resource::new(schema::EVENT)));
            graph.add(RdfTriple::new(event.clone(), Resource::new(rdf::TYPE), Resource::new(crm::E5_EVENT)));
            graph.add(RdfTriple::new(event.clone(), Resource::new(rdfs::LABEL), Literal::lang(context.label.as_str(), LANG)));
            if let Some(start) = &context.start_year {
                graph.add(RdfTriple::new(event.clone(), Resource::new(schema::START_DATE), Literal::year(start.as_str())));
            }
            if let Some(end) = &context.end_year {
                graph.add(RdfTriple::new(event.clone(), Resource::new(schema::END_DATE), Literal::year(end.as_str())));
            }
            graph.add(RdfTriple::new(doc.clone(), Resource::new(schema::ABOUT), event.clone()));

            if let Some(organizer) = &context.organizer {
                let organizer = self.resource(&local_identifier(organizer));
                if graph.has_subject(&organizer) {
                    graph.add(RdfTriple::new(event, Resource::new(schema::ORGANIZER), organizer));
                } else {
                    debug!("Organizer {} not described in the graph, not linked", organizer);
                }
            }
        }

        for related in &self.settings.related_documents {
            let other = self.resource(&related.id);
            graph.add(RdfTriple::new(other.clone(), Resource::new(rdf::TYPE), Resource::new(schema::HISTORICAL_DOCUMENT)));
            graph.add(RdfTriple::new(other.clone(), Resource::new(rdfs::LABEL), Literal::lang(related.label.as_str(), LANG)));
            if let Some(date) = &related.date {
                graph.add(RdfTriple::new(other.clone(), Resource::new(schema::DATE_CREATED), Literal::date(date.as_str())));
            }
            graph.add(RdfTriple::new(doc.clone(), Resource::new(dcterms::RELATION), other.clone()));
            graph.add(RdfTriple::new(doc.clone(), Resource::new(schema::RELATED_LINK), other));
        }
    }
}

/// `"{Type} {n}"` with the division type capitalized; `n` falls back to the
/// 1-based position among divisions of that type.
pub fn event_label(kind: &str, number: Option<&str>, position: usize) -> String {
    let mut chars = kind.chars();
    let kind = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    match number {
        Some(n) => format!("{} {}", kind, n),
        None => format!("{} {}", kind, position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triple::Term;
    use crate::core::vocab::xsd;
    use crate::handlers::tei::tests::SAMPLE_TEI;

    const BASE: &str = "http://example.org/boxer_protocol/";

    fn build(settings: DocumentSettings) -> (KnowledgeGraph, DocumentStats) {
        let document = TeiDocument::parse(SAMPLE_TEI).unwrap();
        let mut graph = KnowledgeGraph::new();
        let stats = DocumentTripleBuilder::new(settings).build(&document, &mut graph);
        (graph, stats)
    }

    fn example_settings() -> DocumentSettings {
        Configuration::example().document
    }

    fn r(local: &str) -> Resource {
        Resource::new(format!("{}{}", BASE, local))
    }

    fn has(graph: &KnowledgeGraph, s: Resource, p: &str, o: impl Into<Term>) -> bool {
        graph.contains(&RdfTriple::new(s, Resource::new(p), o))
    }

    #[test]
    fn test_document_metadata() {
        let (graph, _) = build(example_settings());
        let doc = r("ImperialEdict_1901_02_13");

        assert!(has(&graph, doc.clone(), rdf::TYPE, Resource::new(schema::HISTORICAL_DOCUMENT)));
        assert!(has(&graph, doc.clone(), dcterms::TITLE, Literal::lang("Imperial Edict of 13 February 1901", "en")));
        assert!(has(&graph, doc.clone(), dc::CREATOR, r("QingImperialCourt")));
        assert!(has(&graph, doc.clone(), schema::DATE_CREATED, Literal::typed("1901-02-13", xsd::DATE)));
        assert!(has(&graph, doc.clone(), schema::LOCATION_CREATED, r("Beijing")));
        assert!(has(&graph, doc.clone(), dc::DESCRIPTION, Literal::lang("Translated edict punishing officials & princes.", "en")));
        assert!(has(&graph, doc.clone(), dcterms::LANGUAGE, Literal::plain("eng")));

        let subjects = graph
            .triples()
            .filter(|t| t.subject == doc && t.predicate.as_str() == dc::SUBJECT)
            .count();
        assert_eq!(subjects, 2);
    }

    #[test]
    fn test_entities_and_coordinates() {
        let (graph, stats) = build(example_settings());
        let doc = r("ImperialEdict_1901_02_13");

        assert!(has(&graph, r("zaiyi"), rdf::TYPE, Resource::new(crm::E21_PERSON)));
        assert!(has(&graph, doc.clone(), crm::P67_REFERS_TO, r("zaixun")));
        assert!(has(&graph, r("beijing"), schema::LATITUDE, Literal::float(39.9042)));
        assert!(!graph.triples().any(|t| t.subject == r("xinjiang") && t.predicate.as_str() == schema::LATITUDE));
        assert!(has(&graph, r("boxers"), schema::DESCRIPTION, Literal::lang("Militia movement", "en")));

        assert_eq!(stats.persons, 2);
        assert_eq!(stats.places, 3);
        // The authoring court plus the Boxers.
        assert_eq!(stats.organizations, 2);
    }

    #[test]
    fn test_event_divisions_are_numbered() {
        let (graph, stats) = build(example_settings());
        let first = r("Punishment_1");
        let second = r("Punishment_2");

        assert!(has(&graph, first.clone(), rdfs::LABEL, Literal::lang("Punishment 1", "en")));
        assert!(has(&graph, first.clone(), schema::ACTOR, r("zaiyi")));
        assert!(has(&graph, second.clone(), crm::P11_HAD_PARTICIPANT, r("yingnian")));
        assert!(has(&graph, second.clone(), schema::IS_PART_OF, r("ImperialEdict_1901_02_13")));
        // Punishments plus the configured Boxer Rebellion.
        assert_eq!(stats.events, 3);
    }

    #[test]
    fn test_actors_in_lists_and_nested_mentions() {
        let document = TeiDocument::parse(
            r##"<TEI><text><body>
              <div type="punishment" n="4">
                <list><item><persName ref="#zaiyi">Prince Duan</persName> is exiled.</item></list>
                <p>The <orgName ref="#gansu">army of <persName ref="#dong">Dong Fuxiang</persName></orgName> is disbanded.</p>
              </div>
            </body></text></TEI>"##,
        )
        .unwrap();
        let mut graph = KnowledgeGraph::new();
        DocumentTripleBuilder::new(example_settings()).build(&document, &mut graph);

        let event = r("Punishment_4");
        for person in ["zaiyi", "dong"] {
            assert!(has(&graph, event.clone(), schema::ACTOR, r(person)));
            assert!(has(&graph, event.clone(), crm::P11_HAD_PARTICIPANT, r(person)));
        }
        assert!(!has(&graph, event, schema::ACTOR, r("gansu")));
    }

    #[test]
    fn test_description_is_truncated() {
        let settings = DocumentSettings {
            description_limit: 10,
            ..example_settings()
        };
        let (graph, _) = build(settings);

        let description = graph
            .triples()
            .find(|t| t.subject == r("Punishment_1") && t.predicate.as_str() == schema::DESCRIPTION)
            .and_then(|t| t.object.as_literal())
            .map(|l| l.value().chars().count());
        assert_eq!(description, Some(10));
    }

    #[test]
    fn test_context_and_related_documents() {
        let (graph, _) = build(example_settings());
        let rebellion = r("BoxerRebellion");

        assert!(has(&graph, rebellion.clone(), schema::START_DATE, Literal::typed("1899", xsd::G_YEAR)));
        assert!(has(&graph, rebellion.clone(), schema::ORGANIZER, r("boxers")));
        assert!(has(&graph, r("ImperialEdict_1901_02_13"), dcterms::RELATION, r("BoxerProtocol")));
        assert!(has(&graph, r("BoxerProtocol"), schema::DATE_CREATED, Literal::typed("1901-09-07", xsd::DATE)));
    }

    #[test]
    fn test_organizer_requires_described_subject() {
        let mut settings = example_settings();
        settings.context_events[0].organizer = Some("#righteous_fists".to_string());
        let (graph, _) = build(settings);

        assert!(!graph.triples().any(|t| t.predicate.as_str() == schema::ORGANIZER));
    }

    #[test]
    fn test_default_ids_are_minted() {
        let (graph, _) = build(DocumentSettings::default());
        let doc = r("Imperial_Edict_of_13_February_1901");

        assert!(has(&graph, doc.clone(), dc::CREATOR, r("Qing_Imperial_Court")));
        assert!(has(&graph, doc, schema::LOCATION_CREATED, r("Beijing")));
        assert!(graph.get_entities_by_type(schema::EVENT).len() == 2);
    }

    #[test]
    fn test_empty_document() {
        let document = TeiDocument::parse("<TEI><text><body/></text></TEI>").unwrap();
        let mut graph = KnowledgeGraph::new();
        let stats = DocumentTripleBuilder::new(DocumentSettings::default()).build(&document, &mut graph);

        // Types plus the two language statements.
        assert_eq!(stats.total_triples, 5);
        assert!(graph.has_subject(&r("Document")));
    }

    #[test]
    fn test_event_label() {
        assert_eq!(event_label("punishment", Some("3"), 1), "Punishment 3");
        assert_eq!(event_label("edict", None, 2), "Edict 2");
    }
}
