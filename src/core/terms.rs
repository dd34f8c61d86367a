//! Term resolution: turning free text into IRIs or typed literals.
//!
//! Minted identifiers live under the table's default namespace. Predicates
//! written as `prefix:local` are resolved through the prefix table, and object
//! cells are classified by an ordered list of [`ClassificationRule`]s.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::NamespaceSettings;
use crate::core::triple::{Literal, Resource, Term};
use crate::core::vocab::xsd;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").expect("static pattern"));

static INTEGER_LEXICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("static pattern"));

static DECIMAL_LEXICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$").expect("static pattern")
});

/// Prefix to base-IRI lookup plus the default namespace.
#[derive(Debug, Clone)]
pub struct NamespaceTable {
    default_prefix: String,
    default_base: String,
    prefixes: HashMap<String, String>,
}

impl NamespaceTable {
    pub fn new(default_prefix: &str, default_base: &str) -> Self {
        Self {
            default_prefix: default_prefix.to_string(),
            default_base: default_base.to_string(),
            prefixes: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &NamespaceSettings) -> Self {
        let mut table = Self::new(&settings.default_prefix, &settings.default_base);
        for (prefix, base) in &settings.prefixes {
            table.bind(prefix, base);
        }
        table
    }

    /// Registers a prefix. Lookups are case-insensitive, so prefixes are
    /// stored lower-cased.
    pub fn bind(&mut self, prefix: &str, base: &str) {
        self.prefixes.insert(prefix.to_lowercase(), base.to_string());
    }

    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(&prefix.to_lowercase()).map(String::as_str)
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    pub fn default_base(&self) -> &str {
        &self.default_base
    }

    /// Prefix bindings for serializers, default namespace included, sorted by prefix.
    pub fn bindings(&self) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = self
            .prefixes
            .iter()
            .map(|(p, b)| (p.clone(), b.clone()))
            .collect();
        if !self.prefixes.contains_key(&self.default_prefix.to_lowercase()) {
            bindings.push((self.default_prefix.clone(), self.default_base.clone()));
        }
        bindings.sort();
        bindings
    }

    /// Mints a resource for `text`: absolute http(s) IRIs pass through as-is,
    /// anything else is sanitized into a local name under the default base.
    pub fn mint_reference(&self, text: &str) -> Resource {
        let text = text.trim();
        if is_absolute_http(text) {
            return Resource::new(text);
        }
        Resource::in_namespace(&self.default_base, &sanitize_local_name(text))
    }

    /// Resolves `prefix:local` through the table. Unknown prefixes are folded
    /// into a default-namespace local name with the colon turned into `_`.
    pub fn resolve_predicate(&self, text: &str) -> Resource {
        let text = text.trim();
        match text.split_once(':') {
            Some((prefix, local)) => match self.lookup(prefix) {
                Some(base) => Resource::in_namespace(base, local),
                None => Resource::in_namespace(&self.default_base, &text.replace(':', "_")),
            },
            None => Resource::in_namespace(&self.default_base, text),
        }
    }
}

fn is_absolute_http(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Drops parentheses and commas, turns whitespace into underscores and strips
/// everything outside word characters, `-`, `_` and `.`.
pub fn sanitize_local_name(text: &str) -> String {
    let spaced: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ','))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    UNSAFE_CHARS.replace_all(&spaced, "").into_owned()
}

/// A cell value as handed over by the table loader. Numeric columns keep
/// their origin type so literals can carry the matching datatype; the cell
/// text itself is kept as written.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(String),
    Float(String),
}

impl CellValue {
    pub fn text(&self) -> String {
        match self {
            CellValue::Text(s) | CellValue::Integer(s) | CellValue::Float(s) => s.clone(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, CellValue::Text(_))
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Reference,
    Literal,
}

/// One step of the object classification policy.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationRule {
    /// Text starting with `http` (case-sensitive) is a reference.
    HttpPrefix,
    /// Any indicator substring in the lower-cased text, or a numeric value,
    /// makes a literal. Matching is plain substring search.
    LiteralIndicators(Vec<String>),
    /// An uppercase first character makes a reference.
    ProperNoun,
}

impl ClassificationRule {
    pub fn apply(&self, value: &CellValue) -> Option<Classification> {
        match self {
            ClassificationRule::HttpPrefix => match value {
                CellValue::Text(text) if text.trim().starts_with("http") => {
                    Some(Classification::Reference)
                }
                _ => None,
            },
            ClassificationRule::LiteralIndicators(indicators) => {
                if value.is_numeric() || parses_as_number(&value.text()) {
                    return Some(Classification::Literal);
                }
                let lowered = value.text().to_lowercase();
                indicators
                    .iter()
                    .any(|indicator| lowered.contains(indicator.as_str()))
                    .then_some(Classification::Literal)
            }
            ClassificationRule::ProperNoun => value
                .text()
                .trim()
                .chars()
                .next()
                .filter(|c| c.is_uppercase())
                .map(|_| Classification::Reference),
        }
    }
}

pub const TEMPORAL_INDICATORS: &[&str] = &["century", "dynasty", "period", "year", "ad", "bc", "-"];
pub const UNIT_INDICATORS: &[&str] = &["cm", "mm", "inch", "meter", "kg", "×"];
pub const DESCRIPTIVE_INDICATORS: &[&str] = &[
    "made of",
    "consists of",
    "located at",
    "depicts",
    "shows",
    "approximately",
    "height",
    "width",
    "print",
    "photograph",
];

fn parses_as_number(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok()
}

/// Ordered rule list deciding whether an object becomes a reference or a literal.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        let indicators = TEMPORAL_INDICATORS
            .iter()
            .chain(UNIT_INDICATORS)
            .chain(DESCRIPTIVE_INDICATORS)
            .map(|s| s.to_string())
            .collect();

        Self::with_rules(vec![
            ClassificationRule::HttpPrefix,
            ClassificationRule::LiteralIndicators(indicators),
            ClassificationRule::ProperNoun,
        ])
    }
}

impl Classifier {
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// First matching rule wins; with no match the value is a plain literal.
    pub fn classify(&self, value: &CellValue) -> Classification {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(value))
            .unwrap_or(Classification::Literal)
    }

    /// Classifies `value` and builds the object term for it.
    pub fn classify_object(&self, value: &CellValue, namespaces: &NamespaceTable) -> Term {
        match self.classify(value) {
            Classification::Reference => Term::Resource(namespaces.mint_reference(&value.text())),
            Classification::Literal => Term::Literal(literal_for(value)),
        }
    }
}

/// Numeric cells keep their own type; numeric-looking text becomes
/// `xsd:integer` when it is all digits and `xsd:float` otherwise. The lexical
/// form is the trimmed cell text, never a reformatted number.
fn literal_for(value: &CellValue) -> Literal {
    match value {
        CellValue::Integer(text) => Literal::typed(text.trim(), xsd::INTEGER),
        CellValue::Float(text) => float_literal(text).unwrap_or_else(|| Literal::plain(text.as_str())),
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if INTEGER_LEXICAL.is_match(trimmed) {
                Literal::typed(trimmed, xsd::INTEGER)
            } else {
                float_literal(trimmed).unwrap_or_else(|| Literal::plain(text.as_str()))
            }
        }
    }
}

/// `xsd:float` literal for decimal or exponent text. Spellings such as `inf`
/// or `NaN` map onto the special values `INF`, `-INF` and `NaN`.
fn float_literal(text: &str) -> Option<Literal> {
    let trimmed = text.trim();
    if DECIMAL_LEXICAL.is_match(trimmed) {
        return Some(Literal::typed(trimmed, xsd::FLOAT));
    }
    trimmed.parse::<f64>().ok().map(Literal::float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vocab::{self, xsd};

    fn table() -> NamespaceTable {
        NamespaceTable::from_settings(&NamespaceSettings::default())
    }

    fn classify(text: &str) -> Term {
        Classifier::default().classify_object(&CellValue::from(text), &table())
    }

    #[test]
    fn test_mint_passes_absolute_iris_through() {
        let table = table();
        for iri in [
            "http://www.wikidata.org/entity/Q1",
            "https://collections.example/objects/12 (bad)",
        ] {
            assert_eq!(table.mint_reference(iri).as_str(), iri);
        }
    }

    #[test]
    fn test_mint_sanitizes_free_text() {
        let table = table();
        assert_eq!(
            table.mint_reference("  Gu Kaizhi (attributed), painter ").as_str(),
            "http://example.org/lodlam/Gu_Kaizhi_attributed_painter"
        );
        assert_eq!(
            table.mint_reference("Tower/Stereo #3").as_str(),
            "http://example.org/lodlam/TowerStereo_3"
        );
        assert_eq!(table.mint_reference("").as_str(), vocab::LODLAM);
    }

    #[test]
    fn test_resolve_known_prefix() {
        let table = table();
        assert_eq!(
            table.resolve_predicate("dcterms:creator").as_str(),
            "http://purl.org/dc/terms/creator"
        );
        assert_eq!(
            table.resolve_predicate("DCTERMS:creator").as_str(),
            "http://purl.org/dc/terms/creator"
        );
        assert_eq!(
            table.resolve_predicate("schema:a:b").as_str(),
            "http://schema.org/a:b"
        );
    }

    #[test]
    fn test_resolve_unknown_prefix_and_bare_name() {
        let table = table();
        assert_eq!(
            table.resolve_predicate("unknownprefix:foo").as_str(),
            "http://example.org/lodlam/unknownprefix_foo"
        );
        assert_eq!(
            table.resolve_predicate("a:b:c").as_str(),
            "http://example.org/lodlam/a_b_c"
        );
        assert_eq!(
            table.resolve_predicate("material").as_str(),
            "http://example.org/lodlam/material"
        );
    }

    #[test]
    fn test_proper_noun_becomes_reference() {
        let term = classify("Mount_Longevity");
        assert_eq!(
            term.as_resource().map(Resource::as_str),
            Some("http://example.org/lodlam/Mount_Longevity")
        );
    }

    #[test]
    fn test_indicators_force_literals() {
        for text in ["18th century", "85 cm", "Shows a pagoda", "Qing-era", "Silk × 2"] {
            let term = classify(text);
            assert!(term.as_literal().is_some(), "{} should be a literal", text);
        }
        assert_eq!(classify("18th century").as_literal().unwrap().value(), "18th century");
    }

    #[test]
    fn test_substring_matching_misclassifies_names_containing_ad() {
        // "Admonitions" contains "ad"; without word boundaries it is a literal.
        assert!(classify("Admonitions").as_literal().is_some());
        assert!(classify("Baoding").as_resource().is_some());
    }

    #[test]
    fn test_http_wins_over_indicators() {
        let term = classify("https://example.org/qing-dynasty");
        assert_eq!(
            term.as_resource().map(Resource::as_str),
            Some("https://example.org/qing-dynasty")
        );

        // Starts with "http" but is not an absolute IRI: minted instead.
        let term = classify("httpserver");
        assert_eq!(
            term.as_resource().map(Resource::as_str),
            Some("http://example.org/lodlam/httpserver")
        );
    }

    #[test]
    fn test_numeric_text_gets_numeric_datatype() {
        let int = classify("42");
        assert_eq!(int.as_literal().and_then(Literal::datatype).map(Resource::as_str), Some(xsd::INTEGER));

        let float = classify("3.14");
        assert_eq!(float.as_literal().and_then(Literal::datatype).map(Resource::as_str), Some(xsd::FLOAT));

        let exp = classify("1E3");
        assert_eq!(exp.as_literal().and_then(Literal::datatype).map(Resource::as_str), Some(xsd::FLOAT));
    }

    #[test]
    fn test_numeric_cells_keep_origin_type() {
        let classifier = Classifier::default();
        let table = table();

        let term = classifier.classify_object(&CellValue::Float("2".to_string()), &table);
        let literal = term.as_literal().unwrap();
        assert_eq!(literal.datatype().map(Resource::as_str), Some(xsd::FLOAT));
        assert_eq!(literal.value(), "2");

        let term = classifier.classify_object(&CellValue::Integer("7".to_string()), &table);
        assert_eq!(term.as_literal().and_then(Literal::datatype).map(Resource::as_str), Some(xsd::INTEGER));
    }

    #[test]
    fn test_numeric_text_keeps_lexical_form() {
        let cases = [
            ("12345678901234567890", "12345678901234567890", xsd::INTEGER),
            ("007", "007", xsd::INTEGER),
            (" -12 ", "-12", xsd::INTEGER),
            ("0.1234567890123456789", "0.1234567890123456789", xsd::FLOAT),
            ("1E3", "1E3", xsd::FLOAT),
            (".5", ".5", xsd::FLOAT),
        ];
        for (text, lexical, datatype) in cases {
            let term = classify(text);
            let literal = term.as_literal().unwrap();
            assert_eq!(literal.value(), lexical, "{}", text);
            assert_eq!(literal.datatype().map(Resource::as_str), Some(datatype), "{}", text);
        }
    }

    #[test]
    fn test_non_finite_numbers_use_xsd_spellings() {
        for (text, lexical) in [("inf", "INF"), ("-infinity", "-INF"), ("nan", "NaN")] {
            let term = classify(text);
            let literal = term.as_literal().unwrap();
            assert_eq!(literal.value(), lexical);
            assert_eq!(literal.datatype().map(Resource::as_str), Some(xsd::FLOAT));
        }

        let term = Classifier::default().classify_object(&CellValue::Float("Infinity".to_string()), &table());
        assert_eq!(term.as_literal().unwrap().value(), "INF");
    }

    #[test]
    fn test_lowercase_text_is_plain_literal() {
        let term = classify("silk and ink");
        assert_eq!(term, Term::Literal(Literal::plain("silk and ink")));
    }

    #[test]
    fn test_rules_apply_individually() {
        let proper = ClassificationRule::ProperNoun;
        assert_eq!(proper.apply(&"Throne".into()), Some(Classification::Reference));
        assert_eq!(proper.apply(&"throne".into()), None);

        let http = ClassificationRule::HttpPrefix;
        assert_eq!(http.apply(&"HTTP://x".into()), None);

        let indicators = ClassificationRule::LiteralIndicators(vec!["kg".to_string()]);
        assert_eq!(indicators.apply(&"12 KG".into()), Some(Classification::Literal));
        assert_eq!(indicators.apply(&"Jade".into()), None);
    }

    #[test]
    fn test_bindings_include_default_prefix() {
        let table = NamespaceTable::new("lod", "http://example.org/x/");
        let bindings = table.bindings();
        assert_eq!(bindings, vec![("lod".to_string(), "http://example.org/x/".to_string())]);
    }
}
