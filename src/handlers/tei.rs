//! TEI document model shared by the RDF builder and the HTML renderer.
//!
//! The XML is read with quick-xml into a small element tree, then the parts
//! both pipelines care about are pulled out: header metadata, the person /
//! place / organization lists and the text divisions with their paragraphs.
//! Elements are matched on local names, so the TEI namespace prefix (or its
//! absence) does not matter.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

use crate::error::ConversionError;
use crate::handlers::read_text;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn from_start(start: &BytesStart) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Looks up an attribute by its qualified name, falling back to the part
    /// after the prefix (`id` finds `xml:id`).
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(k, _)| k.rsplit(':').next() == Some(key))
            })
            .map(|(_, v)| v.as_str())
    }

    pub fn xml_id(&self) -> Option<&str> {
        self.attr("xml:id").or_else(|| self.attr("id"))
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |el| el.name == name)
    }

    /// All descendant elements named `name`, in document order.
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for el in self.elements() {
            if el.name == name {
                found.push(el);
            }
            el.collect_descendants(name, found);
        }
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.push_text(out),
            }
        }
    }

    /// Whitespace-normalized text content, `None` when blank.
    pub fn normalized_text(&self) -> Option<String> {
        let text = normalize_whitespace(&self.text_content());
        (!text.is_empty()).then_some(text)
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses XML text into its root element.
pub fn parse_xml(content: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(XmlElement::from_start(e)?),
            Ok(Event::Empty(ref e)) => {
                let el = XmlElement::from_start(e)?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| format!("unbalanced end tag at byte {}", reader.buffer_position()))?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                if let Some(top) = stack.last_mut() {
                    top.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    top.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("XML parse error at byte {}: {}", reader.error_position(), e))
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!("unclosed element <{}>", stack[stack.len() - 1].name));
    }

    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    Person,
    Place,
    Organization,
}

impl MentionKind {
    fn from_element(name: &str) -> Option<Self> {
        match name {
            "persName" => Some(MentionKind::Person),
            "placeName" => Some(MentionKind::Place),
            "orgName" => Some(MentionKind::Organization),
            _ => None,
        }
    }
}

/// A piece of running text: plain text, an entity mention or a date.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Mention {
        kind: MentionKind,
        reference: Option<String>,
        text: String,
    },
    Date {
        when: Option<String>,
        text: String,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Text(text) | Segment::Mention { text, .. } | Segment::Date { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
}

impl Paragraph {
    pub fn from_element(element: &XmlElement) -> Self {
        let mut segments = Vec::new();
        push_segments(element, &mut segments);
        Self { segments }
    }

    pub fn plain_text(&self) -> String {
        let raw: String = self.segments.iter().map(Segment::text).collect();
        normalize_whitespace(&raw)
    }
}

/// Inline children other than mentions and dates are flattened so that
/// mentions nested inside e.g. `<hi>` are still seen.
fn push_segments(element: &XmlElement, segments: &mut Vec<Segment>) {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => segments.push(Segment::Text(text.clone())),
            XmlNode::Element(el) => {
                if let Some(kind) = MentionKind::from_element(&el.name) {
                    segments.push(Segment::Mention {
                        kind,
                        reference: el.attr("ref").map(|r| r.to_string()),
                        text: el.text_content(),
                    });
                } else if el.name == "date" {
                    segments.push(Segment::Date {
                        when: el.attr("when").map(|w| w.to_string()),
                        text: el.text_content(),
                    });
                } else {
                    push_segments(el, segments);
                }
            }
        }
    }
}

/// Strips the `#` marker from a local pointer such as `#li_bingheng`.
pub fn local_identifier(reference: &str) -> String {
    reference.replace('#', "")
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Division {
    pub kind: Option<String>,
    pub number: Option<String>,
    pub head: Option<Paragraph>,
    pub paragraphs: Vec<Paragraph>,
    pub children: Vec<Division>,
    /// Every `persName/@ref` below the division, marker stripped, whatever
    /// element it sits in.
    pub person_refs: Vec<String>,
}

impl Division {
    fn from_element(element: &XmlElement) -> Self {
        Self {
            kind: element.attr("type").map(|t| t.to_string()),
            number: element.attr("n").map(|n| n.to_string()),
            head: element.child("head").map(Paragraph::from_element),
            paragraphs: element.children_named("p").map(Paragraph::from_element).collect(),
            children: element.children_named("div").map(Division::from_element).collect(),
            person_refs: element
                .descendants("persName")
                .into_iter()
                .filter_map(|el| el.attr("ref"))
                .map(local_identifier)
                .collect(),
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// Space-joined plain text of the direct paragraphs.
    pub fn paragraph_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::plain_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A person, place or organization from the back-matter lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    pub id: Option<String>,
    pub name: Option<String>,
    pub note: Option<String>,
    /// `lat lon` text of a place's `location/geo`.
    pub geo: Option<String>,
}

impl Entity {
    fn from_element(element: &XmlElement, name_element: &str) -> Self {
        Self {
            id: element.xml_id().map(|id| id.to_string()),
            name: element.child(name_element).and_then(XmlElement::normalized_text),
            note: element.child("note").and_then(XmlElement::normalized_text),
            geo: element
                .child("location")
                .and_then(|loc| loc.child("geo"))
                .and_then(XmlElement::normalized_text),
        }
    }

    /// Parses `geo` into (latitude, longitude); `None` unless exactly two floats.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let geo = self.geo.as_deref()?;
        let parts: Vec<&str> = geo.split_whitespace().collect();
        match parts.as_slice() {
            [lat, lon] => Some((lat.parse().ok()?, lon.parse().ok()?)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keywords {
    pub scheme: Option<String>,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeiDocument {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub pub_place: Option<String>,
    pub source_description: Option<String>,
    pub keywords: Vec<Keywords>,
    pub persons: Vec<Entity>,
    pub places: Vec<Entity>,
    pub organizations: Vec<Entity>,
    pub divisions: Vec<Division>,
}

impl TeiDocument {
    pub fn from_file(path: &Path) -> Result<Self, ConversionError> {
        let content = read_text(path)?;
        Self::parse(&content).map_err(|reason| ConversionError::SourceUnreadable {
            source_name: path.display().to_string(),
            reason,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let root = parse_xml(content)?;
        Ok(Self::from_root(&root))
    }

    pub fn from_root(root: &XmlElement) -> Self {
        let date = root
            .descendants("publicationStmt")
            .into_iter()
            .find_map(|p| p.child("date").and_then(|d| d.attr("when")).map(|w| w.to_string()));

        let keywords = root
            .descendants("keywords")
            .into_iter()
            .map(|k| Keywords {
                scheme: k.attr("scheme").map(|s| s.to_string()),
                terms: k.children_named("term").filter_map(XmlElement::normalized_text).collect(),
            })
            .collect();

        let mut divisions = Vec::new();
        for part in ["front", "body", "back"] {
            for container in root.descendants(part) {
                divisions.extend(container.children_named("div").map(Division::from_element));
            }
        }

        Self {
            title: first_child_text(root, "titleStmt", "title"),
            author: first_child_text(root, "titleStmt", "author"),
            date,
            pub_place: first_child_text(root, "publicationStmt", "pubPlace"),
            source_description: first_child_text(root, "sourceDesc", "p"),
            keywords,
            persons: list_entities(root, "listPerson", "person", "persName"),
            places: list_entities(root, "listPlace", "place", "placeName"),
            organizations: list_entities(root, "listOrg", "org", "orgName"),
            divisions,
        }
    }

    /// Keyword terms declared under `scheme`.
    pub fn keywords_in_scheme<'a>(&'a self, scheme: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.keywords
            .iter()
            .filter(move |k| k.scheme.as_deref() == Some(scheme))
            .flat_map(|k| k.terms.iter().map(String::as_str))
    }

    /// Every front, body and back division, depth first in document order.
    pub fn all_divisions(&self) -> Vec<&Division> {
        fn walk<'a>(divisions: &'a [Division], out: &mut Vec<&'a Division>) {
            for division in divisions {
                out.push(division);
                walk(&division.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.divisions, &mut out);
        out
    }

    pub fn divisions_of_kind(&self, kind: &str) -> Vec<&Division> {
        self.all_divisions().into_iter().filter(|d| d.is_kind(kind)).collect()
    }

    pub fn declares(&self, id: &str) -> bool {
        self.persons
            .iter()
            .chain(&self.places)
            .chain(&self.organizations)
            .any(|e| e.id.as_deref() == Some(id))
    }
}

fn first_child_text(root: &XmlElement, parent: &str, child: &str) -> Option<String> {
    root.descendants(parent)
        .into_iter()
        .find_map(|p| p.child(child).and_then(XmlElement::normalized_text))
}

fn list_entities(root: &XmlElement, list: &str, item: &str, name: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    for list_element in root.descendants(list) {
        for el in list_element.children_named(item) {
            entities.push(Entity::from_element(el, name));
        }
    }
    entities
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_TEI: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title>Imperial Edict of 13 February 1901</title>
        <author>Qing Imperial Court</author>
      </titleStmt>
      <publicationStmt>
        <pubPlace>Beijing</pubPlace>
        <date when="1901-02-13">13 February 1901</date>
      </publicationStmt>
      <sourceDesc>
        <p>Translated edict punishing officials &amp; princes.</p>
      </sourceDesc>
    </fileDesc>
    <profileDesc>
      <textClass>
        <keywords scheme="LCSH">
          <term>China -- History -- Boxer Rebellion, 1899-1901</term>
          <term>Edicts</term>
        </keywords>
        <keywords scheme="local">
          <term>ignored</term>
        </keywords>
      </textClass>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <div type="section" n="1">
        <head>The <placeName ref="#beijing">capital</placeName> decree</head>
        <p>On <date when="1901-02-13">this day</date> the throne speaks of the
          <orgName ref="#boxers">Boxers</orgName>.</p>
        <div type="punishment" n="1">
          <p><persName ref="#zaiyi">Prince Duan</persName> is banished to
            <placeName ref="#xinjiang">Xinjiang</placeName>.</p>
        </div>
        <div type="punishment">
          <p>Both <persName ref="#zaixun">Zaixun</persName> and
            <hi><persName ref="#yingnian">Yingnian</persName></hi> must die.</p>
        </div>
      </div>
      <div type="conclusion">
        <p>Respect this.</p>
      </div>
    </body>
    <back>
      <listPerson>
        <person xml:id="zaiyi"><persName>Zaiyi, Prince Duan</persName><note>Leader of the court faction</note></person>
        <person xml:id="zaixun"><persName>Zaixun</persName></person>
        <person><persName>Nameless</persName></person>
      </listPerson>
      <listPlace>
        <place xml:id="beijing">
          <placeName>Beijing</placeName>
          <location><geo>39.9042 116.4074</geo></location>
        </place>
        <place xml:id="xinjiang"><placeName>Xinjiang</placeName><location><geo>unknown</geo></location></place>
      </listPlace>
      <listOrg>
        <org xml:id="boxers"><orgName>Boxers</orgName><note>Militia movement</note></org>
      </listOrg>
    </back>
  </text>
</TEI>
"##;

    #[test]
    fn test_header_fields() {
        let doc = TeiDocument::parse(SAMPLE_TEI).unwrap();

        assert_eq!(doc.title.as_deref(), Some("Imperial Edict of 13 February 1901"));
        assert_eq!(doc.author.as_deref(), Some("Qing Imperial Court"));
        assert_eq!(doc.date.as_deref(), Some("1901-02-13"));
        assert_eq!(doc.pub_place.as_deref(), Some("Beijing"));
        assert_eq!(
            doc.source_description.as_deref(),
            Some("Translated edict punishing officials & princes.")
        );
        assert_eq!(doc.keywords_in_scheme("LCSH").count(), 2);
    }

    #[test]
    fn test_entities() {
        let doc = TeiDocument::parse(SAMPLE_TEI).unwrap();

        assert_eq!(doc.persons.len(), 3);
        assert_eq!(doc.persons[0].id.as_deref(), Some("zaiyi"));
        assert_eq!(doc.persons[0].note.as_deref(), Some("Leader of the court faction"));
        assert_eq!(doc.persons[2].id, None);
        assert_eq!(doc.places[0].coordinates(), Some((39.9042, 116.4074)));
        assert_eq!(doc.places[1].coordinates(), None);
        assert!(doc.declares("boxers"));
        assert!(!doc.declares("yingnian"));
    }

    #[test]
    fn test_divisions_and_mentions() {
        let doc = TeiDocument::parse(SAMPLE_TEI).unwrap();

        assert_eq!(doc.divisions.len(), 2);
        assert_eq!(doc.all_divisions().len(), 4);

        let punishments = doc.divisions_of_kind("punishment");
        assert_eq!(punishments.len(), 2);
        assert_eq!(punishments[0].number.as_deref(), Some("1"));
        assert_eq!(punishments[0].person_refs, vec!["zaiyi".to_string()]);
        assert_eq!(
            punishments[1].person_refs,
            vec!["zaixun".to_string(), "yingnian".to_string()]
        );
        assert_eq!(
            punishments[0].paragraph_text(),
            "Prince Duan is banished to Xinjiang."
        );
    }

    #[test]
    fn test_person_refs_reach_lists_and_nested_mentions() {
        let doc = TeiDocument::parse(
            r##"<TEI><text><body>
              <div type="punishment" n="3">
                <list><item><persName ref="#zaiyi">Prince Duan</persName> is exiled.</item></list>
                <p>The <orgName ref="#gansu">troops of <persName ref="#dong">Dong Fuxiang</persName></orgName> disband.</p>
                <ab><quote>By order of <persName ref="#cixi">the Empress Dowager</persName></quote></ab>
              </div>
            </body></text></TEI>"##,
        )
        .unwrap();

        let punishment = doc.divisions_of_kind("punishment")[0];
        assert_eq!(punishment.person_refs, vec!["zaiyi", "dong", "cixi"]);
    }

    #[test]
    fn test_divisions_outside_body_are_kept() {
        let doc = TeiDocument::parse(
            r##"<TEI><text>
              <front><div type="preface"><p>Preface.</p></div></front>
              <body><div type="section" n="1"><p>Decree.</p></div></body>
              <back><div type="punishment" n="9"><p><persName ref="#yuxian">Yuxian</persName> dies.</p></div></back>
            </text></TEI>"##,
        )
        .unwrap();

        let kinds: Vec<_> = doc.divisions.iter().filter_map(|d| d.kind.as_deref()).collect();
        assert_eq!(kinds, vec!["preface", "section", "punishment"]);
        assert_eq!(doc.divisions_of_kind("punishment")[0].person_refs, vec!["yuxian"]);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(TeiDocument::parse("<TEI><text></TEI>").is_err());
        assert!(TeiDocument::parse("").is_err());
    }
}
