use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::ErrorCode;

/// Container kinds a term definition may declare. Ordering follows the
/// keyword spelling so a sorted set concatenates into the inverse context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Container {
    Graph,
    Id,
    Index,
    Language,
    List,
    Set,
    Type,
}

impl Container {
    pub fn as_keyword(&self) -> &'static str {
        match self {
            Container::Graph => "@graph",
            Container::Id => "@id",
            Container::Index => "@index",
            Container::Language => "@language",
            Container::List => "@list",
            Container::Set => "@set",
            Container::Type => "@type",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "@graph" => Some(Container::Graph),
            "@id" => Some(Container::Id),
            "@index" => Some(Container::Index),
            "@language" => Some(Container::Language),
            "@list" => Some(Container::List),
            "@set" => Some(Container::Set),
            "@type" => Some(Container::Type),
            _ => None,
        }
    }
}

/// Base direction of a string. `None` is an explicit "no direction" and
/// differs from an unset mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    None,
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Direction::None => None,
            Direction::Ltr => Some("ltr"),
            Direction::Rtl => Some("rtl"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermDefinition {
    /// `None` marks an inert term: defined, but never expanded or selected.
    pub iri_mapping: Option<String>,
    pub prefix: bool,
    pub protected: bool,
    pub base_url: Option<String>,
    pub reverse: bool,
    pub container_mapping: BTreeSet<Container>,
    pub direction_mapping: Option<Direction>,
    pub type_mapping: Option<String>,
    /// Outer `None` is unset; `Some(None)` is an explicit null language.
    pub language_mapping: Option<Option<String>>,
    pub index_mapping: Option<String>,
    pub local_context: Option<serde_json::Value>,
    pub nest: Option<String>,
}

impl TermDefinition {
    pub fn with_iri(iri: impl Into<String>) -> Self {
        TermDefinition {
            iri_mapping: Some(iri.into()),
            ..Default::default()
        }
    }

    pub fn is_inert(&self) -> bool {
        self.iri_mapping.is_none()
    }

    pub fn has_container(&self, container: Container) -> bool {
        self.container_mapping.contains(&container)
    }

    /// Compares every field except the protected flag. A protected term may
    /// be redefined to an identical definition without error.
    pub fn equivalent_to(&self, other: &TermDefinition) -> bool {
        self.iri_mapping == other.iri_mapping
            && self.prefix == other.prefix
            && self.reverse == other.reverse
            && self.container_mapping == other.container_mapping
            && self.direction_mapping == other.direction_mapping
            && self.type_mapping == other.type_mapping
            && self.language_mapping == other.language_mapping
            && self.index_mapping == other.index_mapping
            && self.local_context == other.local_context
            && self.nest == other.nest
            && self.base_url == other.base_url
    }

    /// Sorted concatenation of container keywords, or `@none`.
    pub fn container_key(&self) -> String {
        if self.container_mapping.is_empty() {
            return "@none".to_string();
        }
        let mut keywords: Vec<&str> = self
            .container_mapping
            .iter()
            .map(Container::as_keyword)
            .collect();
        keywords.sort_unstable();
        keywords.concat()
    }
}

/// A context document fetched by URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteContext {
    pub document_url: String,
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Final URL after redirects.
    pub document_url: String,
    pub context_url: Option<String>,
    pub content_type: Option<String>,
    pub profile: Option<String>,
    pub document: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    pub profile: Option<String>,
    pub request_profile: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorWarning {
    #[serde(serialize_with = "serialize_code")]
    pub code: ErrorCode,
    pub message: String,
}

fn serialize_code<S: serde::Serializer>(code: &ErrorCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(code.as_str())
}

#[derive(Debug, Clone)]
pub enum ContextSource {
    Url(String),
    Inline(serde_json::Value),
}
