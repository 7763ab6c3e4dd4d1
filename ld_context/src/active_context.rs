use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{ErrorCode, JsonLdError};
use crate::inverse_context::InverseContext;
use crate::iri::{has_inner_colon, is_absolute_iri, resolve_iri, split_compact_iri};
use crate::models::{Direction, TermDefinition};
use crate::options::ProcessingMode;
use crate::syntax::{is_keyword, matches_keyword_production};

/// The resolved set of term definitions and defaults in scope at one point
/// of a document.
///
/// Contexts are shared through `Arc` and treated as immutable once shared.
/// Processing a nested scope clones the context, which copies the term map
/// but shares every definition.
#[derive(Debug)]
pub struct ActiveContext {
    base: Option<String>,
    original_base: Option<String>,
    language: Option<String>,
    base_direction: Option<Direction>,
    vocab: Option<String>,
    version: Option<ProcessingMode>,
    previous_context: Option<Arc<ActiveContext>>,
    terms: HashMap<String, Arc<TermDefinition>>,
    inverse: OnceLock<InverseContext>,
}

impl Clone for ActiveContext {
    fn clone(&self) -> Self {
        ActiveContext {
            base: self.base.clone(),
            original_base: self.original_base.clone(),
            language: self.language.clone(),
            base_direction: self.base_direction,
            vocab: self.vocab.clone(),
            version: self.version,
            previous_context: self.previous_context.clone(),
            terms: self.terms.clone(),
            inverse: OnceLock::new(),
        }
    }
}

impl Default for ActiveContext {
    fn default() -> Self {
        ActiveContext::new(None)
    }
}

impl ActiveContext {
    pub fn new(base: Option<String>) -> Self {
        ActiveContext {
            original_base: base.clone(),
            base,
            language: None,
            base_direction: None,
            vocab: None,
            version: None,
            previous_context: None,
            terms: HashMap::new(),
            inverse: OnceLock::new(),
        }
    }

    fn invalidate(&mut self) {
        self.inverse = OnceLock::new();
    }

    // === accessors ===

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn original_base(&self) -> Option<&str> {
        self.original_base.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn base_direction(&self) -> Option<Direction> {
        self.base_direction
    }

    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    pub fn version(&self) -> Option<ProcessingMode> {
        self.version
    }

    pub fn previous_context(&self) -> Option<&Arc<ActiveContext>> {
        self.previous_context.as_ref()
    }

    pub fn set_base(&mut self, base: Option<String>) {
        self.base = base;
        self.invalidate();
    }

    pub fn set_language(&mut self, language: Option<String>) {
        self.language = language;
        self.invalidate();
    }

    pub fn set_base_direction(&mut self, direction: Option<Direction>) {
        self.base_direction = direction;
        self.invalidate();
    }

    pub fn set_vocab(&mut self, vocab: Option<String>) {
        self.vocab = vocab;
        self.invalidate();
    }

    pub fn set_version(&mut self, version: Option<ProcessingMode>) {
        self.version = version;
        self.invalidate();
    }

    pub fn set_previous_context(&mut self, previous: Option<Arc<ActiveContext>>) {
        self.previous_context = previous;
        self.invalidate();
    }

    // === terms ===

    pub fn terms(&self) -> impl Iterator<Item = (&str, &Arc<TermDefinition>)> {
        self.terms.iter().map(|(term, definition)| (term.as_str(), definition))
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn has_term(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// Looks up `term` by key. With `include_aliases`, falls back to a term
    /// whose IRI mapping equals `term`, preferring the shortest and then the
    /// lexicographically smallest name.
    pub fn get_term(&self, term: &str, include_aliases: bool) -> Option<&Arc<TermDefinition>> {
        if let Some(definition) = self.terms.get(term) {
            return Some(definition);
        }
        if !include_aliases {
            return None;
        }
        self.aliases(term)
            .first()
            .and_then(|alias| self.terms.get(*alias))
    }

    /// Names of every term mapped to `iri`, shortest first.
    pub fn aliases(&self, iri: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .terms
            .iter()
            .filter(|(_, definition)| definition.iri_mapping.as_deref() == Some(iri))
            .map(|(term, _)| term.as_str())
            .collect();
        aliases.sort_by(|a, b| a.chars().count().cmp(&b.chars().count()).then_with(|| a.cmp(b)));
        aliases
    }

    /// Inserts or replaces a definition, returning the previous one.
    pub fn set_term(
        &mut self,
        term: impl Into<String>,
        definition: impl Into<Arc<TermDefinition>>,
    ) -> Option<Arc<TermDefinition>> {
        self.invalidate();
        self.terms.insert(term.into(), definition.into())
    }

    pub fn add_term(
        &mut self,
        term: impl Into<String>,
        definition: impl Into<Arc<TermDefinition>>,
    ) -> Result<(), JsonLdError> {
        let term = term.into();
        if self.terms.contains_key(&term) {
            return Err(JsonLdError::new(
                ErrorCode::InvalidTermDefinition,
                format!("term '{}' is already defined", term),
            ));
        }
        self.set_term(term, definition);
        Ok(())
    }

    pub fn remove_term(&mut self, term: &str) -> Option<Arc<TermDefinition>> {
        self.invalidate();
        self.terms.remove(term)
    }

    pub fn has_protected_terms(&self) -> bool {
        self.terms.values().any(|definition| definition.protected)
    }

    // === IRI expansion ===

    /// Expands `value` against the terms and defaults of this context.
    /// Returns `None` for keyword-like values that are not keywords and for
    /// inert terms.
    pub fn expand_iri(&self, value: &str, vocab: bool, document_relative: bool) -> Option<String> {
        if is_keyword(value) {
            return Some(value.to_string());
        }
        if matches_keyword_production(value) {
            return None;
        }

        if let Some(definition) = self.terms.get(value) {
            if let Some(iri) = &definition.iri_mapping
                && is_keyword(iri)
            {
                return Some(iri.clone());
            }
            if vocab {
                return definition.iri_mapping.clone();
            }
        }

        if has_inner_colon(value) {
            let Some((prefix, suffix)) = split_compact_iri(value) else {
                return Some(value.to_string());
            };
            if let Some(definition) = self.terms.get(prefix)
                && definition.prefix
                && let Some(iri) = &definition.iri_mapping
            {
                return Some(format!("{}{}", iri, suffix));
            }
            if is_absolute_iri(value) {
                return Some(value.to_string());
            }
        }

        if vocab && let Some(vocab_iri) = &self.vocab {
            return Some(format!("{}{}", vocab_iri, value));
        }
        if document_relative {
            return Some(resolve_iri(self.base(), value).unwrap_or_else(|| value.to_string()));
        }
        Some(value.to_string())
    }

    // === inverse context ===

    /// Builds the inverse context on first use and memoizes it for the
    /// lifetime of this instance.
    pub fn inverse_context(&self) -> &InverseContext {
        self.inverse.get_or_init(|| InverseContext::build(self))
    }

    pub fn select_term(
        &self,
        iri: &str,
        containers: &[&str],
        type_language: &str,
        preferred_values: &[&str],
    ) -> Option<&str> {
        self.inverse_context()
            .select_term(iri, containers, type_language, preferred_values)
    }

    #[cfg(test)]
    pub(crate) fn inverse_is_cached(&self) -> bool {
        self.inverse.get().is_some()
    }
}
