use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use anyhow::{Result, Context};
use regex::Regex;

use crate::core::vocab;

/// Turtle `PN_PREFIX`: starts with a letter, no trailing `.`.
static PREFIX_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{L}([\p{L}\p{N}_.\-]*[\p{L}\p{N}_\-])?$").expect("static pattern")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub namespaces: NamespaceSettings,
    #[serde(default)]
    pub tabular: TabularSettings,
    #[serde(default)]
    pub document: DocumentSettings,
}

/// Prefix table used to resolve `prefix:local` predicates, plus the default
/// namespace that minted identifiers land in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceSettings {
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
    #[serde(default = "default_base")]
    pub default_base: String,
    #[serde(default = "default_prefixes")]
    pub prefixes: BTreeMap<String, String>,
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            default_prefix: default_prefix(),
            default_base: default_base(),
            prefixes: default_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Turtle,
    NTriples,
    RdfXml,
    JsonLd,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Turtle => "ttl",
            OutputFormat::NTriples => "nt",
            OutputFormat::RdfXml => "rdf",
            OutputFormat::JsonLd => "jsonld",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularSettings {
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default = "default_tabular_output")]
    pub output: PathBuf,
    #[serde(default = "default_primary_format")]
    pub output_format: OutputFormat,
    #[serde(default = "default_tabular_secondary")]
    pub secondary_output: Option<PathBuf>,
    #[serde(default = "default_secondary_format")]
    pub secondary_format: OutputFormat,
    /// Treat a batch where no source could be loaded as an error instead of
    /// writing an empty graph.
    #[serde(default)]
    pub fail_on_empty_batch: bool,
}

impl Default for TabularSettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            source_dir: None,
            output: default_tabular_output(),
            output_format: default_primary_format(),
            secondary_output: default_tabular_secondary(),
            secondary_format: default_secondary_format(),
            fail_on_empty_batch: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    #[serde(default = "default_document_base")]
    pub base_uri: String,
    #[serde(default = "default_document_prefix")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default = "default_keyword_scheme")]
    pub keyword_scheme: String,
    #[serde(default = "default_event_division_types")]
    pub event_division_types: Vec<String>,
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,
    #[serde(default)]
    pub context_events: Vec<ContextEvent>,
    #[serde(default)]
    pub related_documents: Vec<RelatedDocument>,
    #[serde(default = "default_document_output")]
    pub output: PathBuf,
    #[serde(default = "default_document_secondary")]
    pub secondary_output: Option<PathBuf>,
    #[serde(default = "default_html_output")]
    pub html_output: PathBuf,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            base_uri: default_document_base(),
            prefix: default_document_prefix(),
            document_id: None,
            author_id: None,
            place_id: None,
            keyword_scheme: default_keyword_scheme(),
            event_division_types: default_event_division_types(),
            description_limit: default_description_limit(),
            context_events: Vec::new(),
            related_documents: Vec::new(),
            output: default_document_output(),
            secondary_output: default_document_secondary(),
            html_output: default_html_output(),
        }
    }
}

/// A historical event the document is about, not described in the markup itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEvent {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<String>,
    /// Linked only when the organizer is declared in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

fn default_version() -> String { "1.0".to_string() }
fn default_prefix() -> String { "ex".to_string() }
fn default_base() -> String { vocab::LODLAM.to_string() }
fn default_tabular_output() -> PathBuf { PathBuf::from("lodlam_dataset.ttl") }
fn default_tabular_secondary() -> Option<PathBuf> { Some(PathBuf::from("lodlam_dataset.rdf")) }
fn default_primary_format() -> OutputFormat { OutputFormat::Turtle }
fn default_secondary_format() -> OutputFormat { OutputFormat::RdfXml }
fn default_document_base() -> String { vocab::BOXER_PROTOCOL.to_string() }
fn default_document_prefix() -> String { "ex".to_string() }
fn default_keyword_scheme() -> String { "LCSH".to_string() }
fn default_event_division_types() -> Vec<String> { vec!["punishment".to_string()] }
fn default_description_limit() -> usize { 500 }
fn default_document_output() -> PathBuf { PathBuf::from("boxer_protocol.ttl") }
fn default_document_secondary() -> Option<PathBuf> { Some(PathBuf::from("boxer_protocol.rdf")) }
fn default_html_output() -> PathBuf { PathBuf::from("boxer_protocol.html") }

fn default_prefixes() -> BTreeMap<String, String> {
    [
        ("rdf", vocab::RDF),
        ("rdfs", vocab::RDFS),
        ("dcterms", vocab::DCTERMS),
        ("dc", vocab::DC),
        ("foaf", vocab::FOAF),
        ("schema", vocab::SCHEMA),
        ("edm", vocab::EDM),
        ("crm", vocab::CRM),
        ("owl", vocab::OWL),
        ("ex", vocab::LODLAM),
    ]
    .into_iter()
    .map(|(prefix, base)| (prefix.to_string(), base.to_string()))
    .collect()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "Heritage RDF Conversion".to_string(),
            description: String::new(),
            version: default_version(),
            namespaces: NamespaceSettings::default(),
            tabular: TabularSettings::default(),
            document: DocumentSettings::default(),
        }
    }
}

impl Configuration {
    /// Load configuration from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_absolute_base(&self.namespaces.default_base) {
            anyhow::bail!(
                "Default namespace base must be an absolute http(s) IRI: {}",
                self.namespaces.default_base
            );
        }

        let configured_prefixes = self
            .namespaces
            .prefixes
            .keys()
            .chain([&self.namespaces.default_prefix, &self.document.prefix]);
        for prefix in configured_prefixes {
            if !is_prefix_name(prefix) {
                anyhow::bail!("Invalid namespace prefix: '{}'", prefix);
            }
        }

        for (prefix, base) in &self.namespaces.prefixes {
            if !is_absolute_base(base) {
                anyhow::bail!("Namespace '{}' has a non-absolute base: {}", prefix, base);
            }
        }

        if !is_absolute_base(&self.document.base_uri) {
            anyhow::bail!("Document base URI must be an absolute http(s) IRI: {}", self.document.base_uri);
        }

        if self.document.event_division_types.iter().any(|t| t.trim().is_empty()) {
            anyhow::bail!("Event division types must not be empty");
        }

        for event in &self.document.context_events {
            if event.id.trim().is_empty() {
                anyhow::bail!("Context event missing ID: {}", event.label);
            }
        }

        for related in &self.document.related_documents {
            if related.id.trim().is_empty() {
                anyhow::bail!("Related document missing ID: {}", related.label);
            }
        }

        Ok(())
    }

    /// Create an example configuration
    pub fn example() -> Self {
        let sources = [
            "1__Admonitions_of_the_Instructress_to_Court_Ladies.csv",
            "2__Brush_Holder.csv",
            "3__Boxer_Protocol.csv",
            "4__Summer_Palace_Grounds_Photograph.csv",
            "5__Throne.csv",
            "6__Grand_Porcelain_Tower_Stereograph.csv",
            "7__Jewelry.csv",
            "8__Longevity_Mountain_Carving.csv",
            "9__Longevity_Mountain_Stereograph.csv",
            "10__Beautiful_Winding_Corridor.csv",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();

        Configuration {
            name: "LODLAM Heritage Conversion".to_string(),
            description: "Convert object CSV triples and the Boxer Protocol edict into linked data".to_string(),
            version: default_version(),
            namespaces: NamespaceSettings::default(),
            tabular: TabularSettings {
                sources,
                ..TabularSettings::default()
            },
            document: DocumentSettings {
                document_id: Some("ImperialEdict_1901_02_13".to_string()),
                author_id: Some("QingImperialCourt".to_string()),
                place_id: Some("Beijing".to_string()),
                context_events: vec![ContextEvent {
                    id: "BoxerRebellion".to_string(),
                    label: "Boxer Rebellion".to_string(),
                    start_year: Some("1899".to_string()),
                    end_year: Some("1901".to_string()),
                    organizer: Some("boxers".to_string()),
                }],
                related_documents: vec![RelatedDocument {
                    id: "BoxerProtocol".to_string(),
                    label: "Boxer Protocol".to_string(),
                    date: Some("1901-09-07".to_string()),
                }],
                ..DocumentSettings::default()
            },
        }
    }
}

fn is_prefix_name(prefix: &str) -> bool {
    PREFIX_NAME.is_match(prefix)
}

fn is_absolute_base(base: &str) -> bool {
    base.starts_with("http://") || base.starts_with("https://")
}
