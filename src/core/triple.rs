use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::vocab::xsd;

/// An absolute IRI naming an entity or a property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(String);

impl Resource {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    /// Joins a namespace base and a local name without any escaping.
    pub fn in_namespace(base: &str, local: &str) -> Self {
        Self(format!("{}{}", base, local))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Literal {
    Plain { value: String },
    Language { value: String, language: String },
    Typed { value: String, datatype: Resource },
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Literal::Plain { value: value.into() }
    }

    pub fn lang(value: impl Into<String>, language: &str) -> Self {
        Literal::Language {
            value: value.into(),
            language: language.to_string(),
        }
    }

    pub fn typed(value: impl Into<String>, datatype: &str) -> Self {
        Literal::Typed {
            value: value.into(),
            datatype: Resource::new(datatype),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    /// Non-finite values use the `xsd:float` spellings `INF`, `-INF` and `NaN`.
    pub fn float(value: f64) -> Self {
        let lexical = if value.is_nan() {
            "NaN".to_string()
        } else if value == f64::INFINITY {
            "INF".to_string()
        } else if value == f64::NEG_INFINITY {
            "-INF".to_string()
        } else {
            value.to_string()
        };
        Self::typed(lexical, xsd::FLOAT)
    }

    pub fn date(value: impl Into<String>) -> Self {
        Self::typed(value, xsd::DATE)
    }

    pub fn year(value: impl Into<String>) -> Self {
        Self::typed(value, xsd::G_YEAR)
    }

    pub fn value(&self) -> &str {
        match self {
            Literal::Plain { value }
            | Literal::Language { value, .. }
            | Literal::Typed { value, .. } => value,
        }
    }

    pub fn datatype(&self) -> Option<&Resource> {
        match self {
            Literal::Typed { datatype, .. } => Some(datatype),
            _ => None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            Literal::Language { language, .. } => Some(language),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Plain { value } => write!(f, "\"{}\"", escape_literal(value)),
            Literal::Language { value, language } => {
                write!(f, "\"{}\"@{}", escape_literal(value), language)
            }
            Literal::Typed { value, datatype } => {
                write!(f, "\"{}\"^^{}", escape_literal(value), datatype)
            }
        }
    }
}

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Resource(Resource),
    Literal(Literal),
}

impl Term {
    pub fn is_resource(&self) -> bool {
        matches!(self, Term::Resource(_))
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Term::Resource(r) => Some(r),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            Term::Resource(_) => None,
        }
    }
}

impl From<Resource> for Term {
    fn from(resource: Resource) -> Self {
        Term::Resource(resource)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Resource(r) => r.fmt(f),
            Term::Literal(l) => l.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RdfTriple {
    pub subject: Resource,
    pub predicate: Resource,
    pub object: Term,
}

impl RdfTriple {
    pub fn new(subject: Resource, predicate: Resource, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }

    pub fn to_ntriple(&self) -> String {
        format!("{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Escapes a lexical value for a double-quoted Turtle / N-Triples string.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ntriple_with_literal() {
        let triple = RdfTriple::new(
            Resource::new("http://example.org/lodlam/Throne"),
            Resource::new("http://example.org/lodlam/height"),
            Literal::plain("85 \"cm\""),
        );

        assert_eq!(
            triple.to_ntriple(),
            "<http://example.org/lodlam/Throne> <http://example.org/lodlam/height> \"85 \\\"cm\\\"\" ."
        );
    }

    #[test]
    fn test_typed_and_language_literals() {
        assert_eq!(
            Literal::integer(42).to_string(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        assert_eq!(Literal::lang("Beijing", "en").to_string(), "\"Beijing\"@en");
        assert_eq!(Literal::float(3.5).value(), "3.5");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(Literal::float(f64::INFINITY).value(), "INF");
        assert_eq!(Literal::float(f64::NEG_INFINITY).value(), "-INF");
        assert_eq!(Literal::float(f64::NAN).value(), "NaN");
    }
}
