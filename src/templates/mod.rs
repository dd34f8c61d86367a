//! HTML reading edition of a TEI document.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Configuration;
use crate::core::document::event_label;
use crate::error::ConversionError;
use crate::handlers::tei::{local_identifier, Division, Entity, MentionKind, Paragraph, Segment, TeiDocument};

const PAGE_TEMPLATE: &str = include_str!("page.hbs");

const INLINE_PARTIAL: &str = "{{#each segments}}{{#if class}}<span class=\"{{class}}\" title=\"{{title}}\">{{text}}</span>{{else}}{{text}}{{/if}}{{/each}}";

const ENTRY_PARTIAL: &str = "<li><span class=\"name\">{{name}}</span>{{#if note}}<span class=\"note\">- {{note}}</span>{{/if}}</li>";

#[derive(Debug, Serialize)]
struct SegmentView {
    class: Option<&'static str>,
    title: Option<String>,
    text: String,
}

impl From<&Segment> for SegmentView {
    fn from(segment: &Segment) -> Self {
        match segment {
            Segment::Text(text) => Self {
                class: None,
                title: None,
                text: text.clone(),
            },
            Segment::Mention { kind, reference, text } => {
                let (class, label) = match kind {
                    MentionKind::Person => ("person", "Person ID"),
                    MentionKind::Place => ("place", "Place ID"),
                    MentionKind::Organization => ("org", "Organization ID"),
                };
                let id = reference.as_deref().map(local_identifier).unwrap_or_default();
                Self {
                    class: Some(class),
                    title: Some(format!("{}: {}", label, id)),
                    text: text.clone(),
                }
            }
            Segment::Date { when, text } => Self {
                class: Some("date"),
                title: Some(when.clone().unwrap_or_default()),
                text: text.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ParagraphView {
    segments: Vec<SegmentView>,
}

impl From<&Paragraph> for ParagraphView {
    fn from(paragraph: &Paragraph) -> Self {
        Self {
            segments: paragraph.segments.iter().map(SegmentView::from).collect(),
        }
    }
}

fn paragraphs(division: &Division) -> Vec<ParagraphView> {
    division.paragraphs.iter().map(ParagraphView::from).collect()
}

#[derive(Debug, Serialize)]
struct EventView {
    label: String,
    paragraphs: Vec<ParagraphView>,
}

#[derive(Debug, Serialize)]
struct SectionView {
    heading: Option<ParagraphView>,
    number: Option<String>,
    paragraphs: Vec<ParagraphView>,
    events: Vec<EventView>,
}

#[derive(Debug, Serialize)]
struct EntryView {
    name: String,
    note: Option<String>,
}

impl From<&Entity> for EntryView {
    fn from(entity: &Entity) -> Self {
        Self {
            name: entity.name.clone().unwrap_or_default(),
            note: entity.note.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PageView {
    title: String,
    author: String,
    date: String,
    place: String,
    sections: Vec<SectionView>,
    conclusion: Option<Vec<ParagraphView>>,
    persons: Vec<EntryView>,
    places: Vec<EntryView>,
    organizations: Vec<EntryView>,
}

pub struct HtmlRenderer {
    handlebars: Handlebars<'static>,
    event_division_types: Vec<String>,
}

impl HtmlRenderer {
    pub fn new(event_division_types: Vec<String>) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_partial("inline", INLINE_PARTIAL)
            .context("Failed to register inline partial")?;
        handlebars
            .register_partial("entry", ENTRY_PARTIAL)
            .context("Failed to register index entry partial")?;
        handlebars
            .register_template_string("page", PAGE_TEMPLATE)
            .context("Failed to register page template")?;

        Ok(Self {
            handlebars,
            event_division_types,
        })
    }

    pub fn from_config(config: &Configuration) -> Result<Self> {
        Self::new(config.document.event_division_types.clone())
    }

    fn section_view(&self, division: &Division) -> SectionView {
        let mut events = Vec::new();
        for kind in &self.event_division_types {
            let matching = division.children.iter().filter(|child| child.is_kind(kind));
            for (index, child) in matching.enumerate() {
                events.push(EventView {
                    label: event_label(kind, child.number.as_deref(), index + 1),
                    paragraphs: paragraphs(child),
                });
            }
        }

        SectionView {
            heading: division.head.as_ref().map(ParagraphView::from),
            number: division.number.clone(),
            paragraphs: paragraphs(division),
            events,
        }
    }

    pub fn render(&self, document: &TeiDocument) -> Result<String> {
        let sections: Vec<SectionView> = document
            .divisions_of_kind("section")
            .into_iter()
            .map(|division| self.section_view(division))
            .collect();
        debug!("Rendering {} sections", sections.len());

        let page = PageView {
            title: document.title.clone().unwrap_or_default(),
            author: document.author.clone().unwrap_or_default(),
            date: document.date.clone().unwrap_or_default(),
            place: document.pub_place.clone().unwrap_or_default(),
            sections,
            conclusion: document.divisions_of_kind("conclusion").first().map(|d| paragraphs(d)),
            persons: document.persons.iter().map(EntryView::from).collect(),
            places: document.places.iter().map(EntryView::from).collect(),
            organizations: document.organizations.iter().map(EntryView::from).collect(),
        };

        self.handlebars
            .render("page", &page)
            .with_context(|| "Failed to render page template")
    }

    pub fn render_to_file(&self, document: &TeiDocument, target: &Path) -> Result<(), ConversionError> {
        let sink_error = |source: std::io::Error| ConversionError::SinkWrite {
            target: target.to_path_buf(),
            source,
        };

        let html = self
            .render(document)
            .map_err(|e| sink_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))?;
        fs::write(target, html).map_err(sink_error)?;

        info!("HTML file generated: {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tei::tests::SAMPLE_TEI;

    fn render(tei: &str) -> String {
        let document = TeiDocument::parse(tei).unwrap();
        HtmlRenderer::new(vec!["punishment".to_string()])
            .unwrap()
            .render(&document)
            .unwrap()
    }

    #[test]
    fn test_header_and_sections() {
        let html = render(SAMPLE_TEI);

        assert!(html.contains("<title>Imperial Edict of 13 February 1901</title>"));
        assert!(html.contains("<strong>Author:</strong> Qing Imperial Court"));
        assert!(html.contains("<strong>Date:</strong> 1901-02-13"));
        assert!(html.contains(r#"<h2 class="section-title">The <span class="place" title="Place ID: beijing">capital</span> decree</h2>"#));
        assert!(html.contains(r#"<span class="date" title="1901-02-13">this day</span>"#));
        assert!(html.contains(r#"<span class="org" title="Organization ID: boxers">Boxers</span>"#));
    }

    #[test]
    fn test_event_boxes_and_nested_mentions() {
        let html = render(SAMPLE_TEI);

        assert!(html.contains(r#"<div class="event-number">Punishment 1</div>"#));
        assert!(html.contains(r#"<div class="event-number">Punishment 2</div>"#));
        assert!(html.contains(r#"<span class="person" title="Person ID: zaiyi">Prince Duan</span>"#));
        assert!(html.contains(r#"<span class="person" title="Person ID: yingnian">Yingnian</span>"#));
    }

    #[test]
    fn test_conclusion_and_indexes() {
        let html = render(SAMPLE_TEI);

        assert!(html.contains(r#"<div class="conclusion">"#));
        assert!(html.contains("Respect this."));
        assert!(html.contains("<h3>Index of Persons</h3>"));
        assert!(html.contains(r#"<li><span class="name">Zaiyi, Prince Duan</span><span class="note">- Leader of the court faction</span></li>"#));
        assert!(html.contains(r#"<li><span class="name">Zaixun</span></li>"#));
        assert!(html.contains("<h3>Index of Organizations</h3>"));
    }

    #[test]
    fn test_text_is_escaped_and_missing_header_is_empty() {
        let html = render(
            r#"<TEI><text><body><div type="section" n="2"><p>Silver &amp; silk &lt;tribute&gt;</p></div></body></text></TEI>"#,
        );

        assert!(html.contains("<title></title>"));
        assert!(html.contains(r#"<h2 class="section-title">Section 2</h2>"#));
        assert!(html.contains("Silver &amp; silk &lt;tribute&gt;"));
        assert!(!html.contains("<tribute>"));
        assert!(!html.contains("Index of Persons"));
    }

    #[test]
    fn test_render_to_unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        let document = TeiDocument::parse(SAMPLE_TEI).unwrap();
        let renderer = HtmlRenderer::new(Vec::new()).unwrap();

        let target = dir.path().join("edict.html");
        renderer.render_to_file(&document, &target).unwrap();
        assert!(fs::read_to_string(&target).unwrap().contains("Imperial Edict"));

        let err = renderer
            .render_to_file(&document, &dir.path().join("no").join("edict.html"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::SinkWrite { .. }));
    }
}
