//! IRIs of the vocabularies used when building graphs: namespace bases for
//! prefix tables and the fixed terms the document builder emits.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const FOAF: &str = "http://xmlns.com/foaf/0.1/";
pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const SCHEMA: &str = "http://schema.org/";
pub const EDM: &str = "http://www.europeana.eu/schemas/edm/";
pub const CRM: &str = "http://www.cidoc-crm.org/cidoc-crm/";

pub const LODLAM: &str = "http://example.org/lodlam/";
pub const BOXER_PROTOCOL: &str = "http://example.org/boxer_protocol/";

pub mod rdf {
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

pub mod rdfs {
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
}

pub mod xsd {
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const G_YEAR: &str = "http://www.w3.org/2001/XMLSchema#gYear";
}

pub mod dc {
    pub const TITLE: &str = "http://purl.org/dc/elements/1.1/title";
    pub const CREATOR: &str = "http://purl.org/dc/elements/1.1/creator";
    pub const DATE: &str = "http://purl.org/dc/elements/1.1/date";
    pub const DESCRIPTION: &str = "http://purl.org/dc/elements/1.1/description";
    pub const LANGUAGE: &str = "http://purl.org/dc/elements/1.1/language";
    pub const SUBJECT: &str = "http://purl.org/dc/elements/1.1/subject";
}

pub mod dcterms {
    pub const TITLE: &str = "http://purl.org/dc/terms/title";
    pub const CREATOR: &str = "http://purl.org/dc/terms/creator";
    pub const CREATED: &str = "http://purl.org/dc/terms/created";
    pub const DESCRIPTION: &str = "http://purl.org/dc/terms/description";
    pub const LANGUAGE: &str = "http://purl.org/dc/terms/language";
    pub const SUBJECT: &str = "http://purl.org/dc/terms/subject";
    pub const RELATION: &str = "http://purl.org/dc/terms/relation";
}

pub mod foaf {
    pub const PERSON: &str = "http://xmlns.com/foaf/0.1/Person";
    pub const ORGANIZATION: &str = "http://xmlns.com/foaf/0.1/Organization";
    pub const DOCUMENT: &str = "http://xmlns.com/foaf/0.1/Document";
    pub const NAME: &str = "http://xmlns.com/foaf/0.1/name";
}

pub mod schema {
    pub const HISTORICAL_DOCUMENT: &str = "http://schema.org/HistoricalDocument";
    pub const PERSON: &str = "http://schema.org/Person";
    pub const PLACE: &str = "http://schema.org/Place";
    pub const ORGANIZATION: &str = "http://schema.org/Organization";
    pub const EVENT: &str = "http://schema.org/Event";
    pub const NAME: &str = "http://schema.org/name";
    pub const DESCRIPTION: &str = "http://schema.org/description";
    pub const DATE_CREATED: &str = "http://schema.org/dateCreated";
    pub const LOCATION_CREATED: &str = "http://schema.org/locationCreated";
    pub const LATITUDE: &str = "http://schema.org/latitude";
    pub const LONGITUDE: &str = "http://schema.org/longitude";
    pub const MENTIONS: &str = "http://schema.org/mentions";
    pub const ABOUT: &str = "http://schema.org/about";
    pub const IS_PART_OF: &str = "http://schema.org/isPartOf";
    pub const ACTOR: &str = "http://schema.org/actor";
    pub const START_DATE: &str = "http://schema.org/startDate";
    pub const END_DATE: &str = "http://schema.org/endDate";
    pub const ORGANIZER: &str = "http://schema.org/organizer";
    pub const RELATED_LINK: &str = "http://schema.org/relatedLink";
}

pub mod crm {
    pub const E5_EVENT: &str = "http://www.cidoc-crm.org/cidoc-crm/E5_Event";
    pub const E21_PERSON: &str = "http://www.cidoc-crm.org/cidoc-crm/E21_Person";
    pub const E31_DOCUMENT: &str = "http://www.cidoc-crm.org/cidoc-crm/E31_Document";
    pub const E53_PLACE: &str = "http://www.cidoc-crm.org/cidoc-crm/E53_Place";
    pub const E74_GROUP: &str = "http://www.cidoc-crm.org/cidoc-crm/E74_Group";
    pub const P11_HAD_PARTICIPANT: &str = "http://www.cidoc-crm.org/cidoc-crm/P11_had_participant";
    pub const P67_REFERS_TO: &str = "http://www.cidoc-crm.org/cidoc-crm/P67_refers_to";
}
