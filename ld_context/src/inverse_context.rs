use std::collections::BTreeMap;

use serde::Serialize;

use crate::active_context::ActiveContext;
use crate::models::Direction;

/// Candidate terms for one IRI and container combination, keyed by type or
/// language selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeLanguageMap {
    #[serde(rename = "@language")]
    pub language: BTreeMap<String, String>,
    #[serde(rename = "@type")]
    pub type_map: BTreeMap<String, String>,
    #[serde(rename = "@any")]
    pub any: BTreeMap<String, String>,
}

impl TypeLanguageMap {
    fn new(term: &str) -> Self {
        TypeLanguageMap {
            language: BTreeMap::new(),
            type_map: BTreeMap::new(),
            any: BTreeMap::from([("@none".to_string(), term.to_string())]),
        }
    }

    /// `@language`, `@type` or `@any`.
    pub fn value_map(&self, selector: &str) -> Option<&BTreeMap<String, String>> {
        match selector {
            "@language" => Some(&self.language),
            "@type" => Some(&self.type_map),
            "@any" => Some(&self.any),
            _ => None,
        }
    }
}

pub type ContainerMap = BTreeMap<String, TypeLanguageMap>;

/// IRI -> container key -> type/language map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InverseContext {
    entries: BTreeMap<String, ContainerMap>,
}

fn insert_first(map: &mut BTreeMap<String, String>, key: impl Into<String>, term: &str) {
    map.entry(key.into()).or_insert_with(|| term.to_string());
}

fn direction_suffix(direction: Direction) -> String {
    direction
        .as_str()
        .map(|dir| format!("_{dir}"))
        .unwrap_or_default()
}

impl InverseContext {
    pub fn build(context: &ActiveContext) -> Self {
        let default_language = context
            .language()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "@none".to_string());

        let mut terms: Vec<&str> = context.terms().map(|(term, _)| term).collect();
        terms.sort_by(|a, b| a.chars().count().cmp(&b.chars().count()).then_with(|| a.cmp(b)));

        let mut entries: BTreeMap<String, ContainerMap> = BTreeMap::new();
        for term in terms {
            let Some(definition) = context.get_term(term, false) else {
                continue;
            };
            let Some(iri) = definition.iri_mapping.as_deref() else {
                continue;
            };

            let container = definition.container_key();
            let type_language = entries
                .entry(iri.to_string())
                .or_default()
                .entry(container)
                .or_insert_with(|| TypeLanguageMap::new(term));

            if definition.reverse {
                insert_first(&mut type_language.type_map, "@reverse", term);
            } else if definition.type_mapping.as_deref() == Some("@none") {
                insert_first(&mut type_language.language, "@any", term);
                insert_first(&mut type_language.type_map, "@any", term);
            } else if let Some(type_mapping) = &definition.type_mapping {
                insert_first(&mut type_language.type_map, type_mapping.as_str(), term);
            } else if let (Some(language), Some(direction)) =
                (&definition.language_mapping, definition.direction_mapping)
            {
                let lang_dir = match (language, direction.as_str()) {
                    (Some(language), Some(dir)) => format!("{}_{}", language.to_lowercase(), dir),
                    (Some(language), None) => language.to_lowercase(),
                    (None, Some(dir)) => format!("_{dir}"),
                    (None, None) => "@null".to_string(),
                };
                insert_first(&mut type_language.language, lang_dir, term);
            } else if let Some(language) = &definition.language_mapping {
                let language = language
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| "@null".to_string());
                insert_first(&mut type_language.language, language, term);
            } else if let Some(direction) = definition.direction_mapping {
                let key = match direction.as_str() {
                    Some(dir) => format!("_{dir}"),
                    None => "@none".to_string(),
                };
                insert_first(&mut type_language.language, key, term);
            } else if let Some(base_direction) = context.base_direction() {
                let lang_dir = format!(
                    "{}{}",
                    context.language().map(str::to_lowercase).unwrap_or_default(),
                    direction_suffix(base_direction)
                );
                insert_first(&mut type_language.language, lang_dir, term);
                insert_first(&mut type_language.language, "@none", term);
                insert_first(&mut type_language.type_map, "@none", term);
            } else {
                insert_first(&mut type_language.language, default_language.as_str(), term);
                insert_first(&mut type_language.language, "@none", term);
                insert_first(&mut type_language.type_map, "@none", term);
            }
        }

        InverseContext { entries }
    }

    pub fn get(&self, iri: &str) -> Option<&ContainerMap> {
        self.entries.get(iri)
    }

    pub fn contains_iri(&self, iri: &str) -> bool {
        self.entries.contains_key(iri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks the best term for `iri`. Containers are tried in order, then
    /// preferred values in order; the first hit wins.
    pub fn select_term(
        &self,
        iri: &str,
        containers: &[&str],
        type_language: &str,
        preferred_values: &[&str],
    ) -> Option<&str> {
        let container_map = self.entries.get(iri)?;
        for container in containers {
            let Some(type_language_map) = container_map.get(*container) else {
                continue;
            };
            let Some(value_map) = type_language_map.value_map(type_language) else {
                continue;
            };
            if let Some(term) = preferred_values
                .iter()
                .find_map(|item| value_map.get(*item))
            {
                return Some(term.as_str());
            }
        }
        None
    }
}
