use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::active_context::ActiveContext;
use crate::context_fetcher::RemoteContextProvider;
use crate::error::{ErrorCode, JsonLdError};
use crate::iri::{
    ends_with_gen_delim, has_inner_colon, is_absolute_iri, is_blank_node_identifier, is_iri,
    is_relative_iri, resolve_iri, split_compact_iri,
};
use crate::models::{Container, Direction, ProcessorWarning, RemoteContext, TermDefinition};
use crate::options::{ProcessingMode, ProcessorOptions};
use crate::syntax::{
    CONTEXT_KEYWORDS, TERM_DEFINITION_KEYS, is_keyword, is_well_formed_language_tag,
    matches_keyword_production, parse_direction,
};

/// Flags controlling how one local context is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFlags {
    /// Allows protected terms to be redefined (property-scoped contexts).
    pub override_protected: bool,
    /// `false` for type-scoped contexts that must not leak into nested nodes.
    pub propagate: bool,
    /// `false` while checking a scoped context in a term definition; remote
    /// references already being processed are then skipped.
    pub validate_scoped_context: bool,
}

impl Default for ContextFlags {
    fn default() -> Self {
        ContextFlags {
            override_protected: false,
            propagate: true,
            validate_scoped_context: true,
        }
    }
}

/// Settings shared by every term of one context definition.
struct TermScope<'b> {
    base_url: Option<&'b str>,
    protected: bool,
    override_protected: bool,
}

/// Applies local contexts to an active context.
///
/// A processor borrows the remote context provider for one processing run and
/// tracks the remote references of that run: the chain currently being
/// processed (cycles) and every distinct URL fetched so far (the remote
/// context limit).
pub struct ContextProcessor<'a> {
    options: &'a ProcessorOptions,
    provider: &'a mut RemoteContextProvider,
    warnings: Vec<ProcessorWarning>,
    in_flight: Vec<String>,
    loaded: HashSet<String>,
}

impl<'a> ContextProcessor<'a> {
    pub fn new(options: &'a ProcessorOptions, provider: &'a mut RemoteContextProvider) -> Self {
        ContextProcessor {
            options,
            provider,
            warnings: Vec::new(),
            in_flight: Vec::new(),
            loaded: HashSet::new(),
        }
    }

    /// Warnings collected so far. Only populated in safe mode.
    pub fn warnings(&self) -> &[ProcessorWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ProcessorWarning> {
        self.warnings
    }

    /// Number of distinct remote documents fetched during this run.
    pub fn remote_fetch_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn process_context(
        &mut self,
        active: &Arc<ActiveContext>,
        local: &Value,
        base_url: Option<&str>,
    ) -> Result<ActiveContext, JsonLdError> {
        self.process(active, local, base_url, ContextFlags::default())
    }

    pub fn process_context_with(
        &mut self,
        active: &Arc<ActiveContext>,
        local: &Value,
        base_url: Option<&str>,
        flags: ContextFlags,
    ) -> Result<ActiveContext, JsonLdError> {
        self.process(active, local, base_url, flags)
    }

    fn is_json_ld_10(&self) -> bool {
        self.options.is_json_ld_10()
    }

    fn warn(&mut self, code: ErrorCode, message: String) {
        warn!(code = %code, "{}", message);
        if self.options.safe_mode {
            self.warnings.push(ProcessorWarning { code, message });
        }
    }

    fn require_json_ld_11(&self, key: &str, code: ErrorCode) -> Result<(), JsonLdError> {
        if self.is_json_ld_10() {
            return Err(JsonLdError::new(
                code,
                format!("{} is not supported in json-ld-1.0 processing mode", key),
            ));
        }
        Ok(())
    }

    /// Loads a remote context. A URL is charged against the run's fetch
    /// budget the first time it loads successfully.
    fn fetch(&mut self, url: &str) -> Result<Arc<RemoteContext>, JsonLdError> {
        if !self.loaded.contains(url) && !self.options.allows_remote_fetch(self.loaded.len()) {
            return Err(JsonLdError::new(
                ErrorCode::ContextOverflow,
                format!(
                    "loading '{}' exceeds the remote context limit of {}",
                    url, self.options.remote_context_limit
                ),
            ));
        }
        let context = self.provider.get_remote_context(url)?;
        self.loaded.insert(url.to_string());
        Ok(context)
    }

    // === Context Processing ===

    fn process(
        &mut self,
        active: &Arc<ActiveContext>,
        local: &Value,
        base_url: Option<&str>,
        flags: ContextFlags,
    ) -> Result<ActiveContext, JsonLdError> {
        let mut result = active.as_ref().clone();
        let mut propagate = flags.propagate;

        if let Value::Object(map) = local
            && let Some(value) = map.get("@propagate")
        {
            propagate = value.as_bool().ok_or_else(|| {
                JsonLdError::new(
                    ErrorCode::InvalidPropagateValue,
                    format!("@propagate must be a boolean, found {}", value),
                )
            })?;
        }

        if !propagate && result.previous_context().is_none() {
            result.set_previous_context(Some(Arc::clone(active)));
        }

        let items: Vec<&Value> = match local {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        for item in items {
            match item {
                Value::Null => {
                    if !flags.override_protected && result.has_protected_terms() {
                        return Err(JsonLdError::new(
                            ErrorCode::InvalidContextNullification,
                            "cannot nullify a context containing protected terms",
                        ));
                    }
                    let mut reset = ActiveContext::new(active.original_base().map(str::to_string));
                    if !propagate {
                        reset.set_previous_context(Some(Arc::new(result)));
                    }
                    result = reset;
                }
                Value::String(reference) => {
                    let url = resolve_iri(base_url, reference).ok_or_else(|| {
                        JsonLdError::loading(
                            ErrorCode::LoadingDocumentFailed,
                            reference.as_str(),
                            "context reference cannot be resolved against the base URL",
                        )
                    })?;

                    if self.in_flight.contains(&url) {
                        if !flags.validate_scoped_context {
                            debug!(url, "skipping remote context already being processed");
                            continue;
                        }
                        return Err(JsonLdError::new(
                            ErrorCode::RecursiveContextInclusion,
                            format!("context '{}' includes itself", url),
                        ));
                    }

                    let remote = self.fetch(&url)?;
                    debug!(url, depth = self.in_flight.len(), "processing remote context");

                    self.in_flight.push(url);
                    let processed = self.process(
                        &Arc::new(result),
                        &remote.context,
                        Some(&remote.document_url),
                        ContextFlags {
                            validate_scoped_context: flags.validate_scoped_context,
                            ..ContextFlags::default()
                        },
                    );
                    self.in_flight.pop();
                    result = processed?;
                }
                Value::Object(definition) => {
                    self.apply_definition(&mut result, definition, base_url, flags)?;
                }
                other => {
                    return Err(JsonLdError::new(
                        ErrorCode::InvalidLocalContext,
                        format!("local context must be a map, string or null, found {}", other),
                    ));
                }
            }
        }

        Ok(result)
    }

    fn apply_definition(
        &mut self,
        result: &mut ActiveContext,
        context: &Map<String, Value>,
        base_url: Option<&str>,
        flags: ContextFlags,
    ) -> Result<(), JsonLdError> {
        if let Some(version) = context.get("@version") {
            if version.as_f64() != Some(1.1) {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidVersionValue,
                    format!("@version must be 1.1, found {}", version),
                ));
            }
            self.require_json_ld_11("@version", ErrorCode::ProcessingModeConflict)?;
            result.set_version(Some(ProcessingMode::JsonLd11));
        }

        let merged;
        let context = match context.get("@import") {
            Some(import) => {
                merged = self.import_context(context, import, base_url)?;
                &merged
            }
            None => context,
        };

        if let Some(base) = context.get("@base")
            && self.in_flight.is_empty()
        {
            let new_base = match base {
                Value::Null => None,
                Value::String(value) if is_absolute_iri(value) => Some(value.clone()),
                Value::String(value) if is_relative_iri(value) => {
                    let resolved = result.base().and_then(|current| resolve_iri(Some(current), value));
                    Some(resolved.ok_or_else(|| {
                        JsonLdError::new(
                            ErrorCode::InvalidBaseIri,
                            format!("relative @base '{}' has no base IRI to resolve against", value),
                        )
                    })?)
                }
                other => {
                    return Err(JsonLdError::new(
                        ErrorCode::InvalidBaseIri,
                        format!("@base must be an IRI or null, found {}", other),
                    ));
                }
            };
            result.set_base(new_base);
        }

        if let Some(vocab) = context.get("@vocab") {
            let new_vocab = match vocab {
                Value::Null => None,
                Value::String(value)
                    if is_absolute_iri(value)
                        || is_blank_node_identifier(value)
                        || (!self.is_json_ld_10() && (value.is_empty() || is_iri(value))) =>
                {
                    Some(result.expand_iri(value, true, true).ok_or_else(|| {
                        JsonLdError::new(
                            ErrorCode::InvalidVocabMapping,
                            format!("@vocab '{}' does not expand to an IRI", value),
                        )
                    })?)
                }
                other => {
                    return Err(JsonLdError::new(
                        ErrorCode::InvalidVocabMapping,
                        format!("@vocab must be an IRI, blank node identifier or null, found {}", other),
                    ));
                }
            };
            result.set_vocab(new_vocab);
        }

        if let Some(language) = context.get("@language") {
            let new_language = match language {
                Value::Null => None,
                Value::String(value) => {
                    if !is_well_formed_language_tag(value) {
                        self.warn(
                            ErrorCode::MalformedLanguageTag,
                            format!("default language '{}' is not a well-formed language tag", value),
                        );
                    }
                    Some(value.to_lowercase())
                }
                other => {
                    return Err(JsonLdError::new(
                        ErrorCode::InvalidDefaultLanguage,
                        format!("@language must be a string or null, found {}", other),
                    ));
                }
            };
            result.set_language(new_language);
        }

        if let Some(direction) = context.get("@direction") {
            self.require_json_ld_11("@direction", ErrorCode::InvalidContextEntry)?;
            let new_direction = match direction {
                Value::Null => None,
                Value::String(value) => Some(parse_direction(value).ok_or_else(|| {
                    JsonLdError::new(
                        ErrorCode::InvalidBaseDirection,
                        format!("@direction must be 'ltr' or 'rtl', found '{}'", value),
                    )
                })?),
                other => {
                    return Err(JsonLdError::new(
                        ErrorCode::InvalidBaseDirection,
                        format!("@direction must be a string or null, found {}", other),
                    ));
                }
            };
            result.set_base_direction(new_direction);
        }

        if let Some(propagate) = context.get("@propagate") {
            self.require_json_ld_11("@propagate", ErrorCode::InvalidContextEntry)?;
            if !propagate.is_boolean() {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidPropagateValue,
                    format!("@propagate must be a boolean, found {}", propagate),
                ));
            }
        }

        let protected = match context.get("@protected") {
            None => false,
            Some(Value::Bool(value)) => *value,
            Some(other) => {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidProtectedValue,
                    format!("@protected must be a boolean, found {}", other),
                ));
            }
        };

        let scope = TermScope {
            base_url,
            protected,
            override_protected: flags.override_protected,
        };
        let mut defined: HashMap<String, bool> = HashMap::new();
        for term in context.keys() {
            if CONTEXT_KEYWORDS.contains(&term.as_str()) {
                continue;
            }
            self.create_term_definition(result, context, term, &mut defined, &scope)?;
        }

        Ok(())
    }

    /// Loads the context named by `@import` and overlays the local entries.
    fn import_context(
        &mut self,
        context: &Map<String, Value>,
        import: &Value,
        base_url: Option<&str>,
    ) -> Result<Map<String, Value>, JsonLdError> {
        self.require_json_ld_11("@import", ErrorCode::InvalidContextEntry)?;
        let Value::String(reference) = import else {
            return Err(JsonLdError::new(
                ErrorCode::InvalidImportValue,
                format!("@import must be a string, found {}", import),
            ));
        };
        let url = resolve_iri(base_url, reference).ok_or_else(|| {
            JsonLdError::new(
                ErrorCode::InvalidImportValue,
                format!("@import '{}' cannot be resolved against the base URL", reference),
            )
        })?;

        let remote = self.fetch(&url)?;
        let Value::Object(imported) = &remote.context else {
            return Err(JsonLdError::new(
                ErrorCode::InvalidRemoteContext,
                format!("context imported from '{}' is not a map", url),
            ));
        };
        if imported.contains_key("@import") {
            return Err(JsonLdError::new(
                ErrorCode::InvalidContextEntry,
                format!("context imported from '{}' contains @import", url),
            ));
        }

        let mut merged = imported.clone();
        for (key, value) in context {
            if key != "@import" {
                merged.insert(key.clone(), value.clone());
            }
        }
        Ok(merged)
    }

    // === Create Term Definition ===

    fn create_term_definition(
        &mut self,
        active: &mut ActiveContext,
        local: &Map<String, Value>,
        term: &str,
        defined: &mut HashMap<String, bool>,
        scope: &TermScope<'_>,
    ) -> Result<(), JsonLdError> {
        match defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(JsonLdError::new(
                    ErrorCode::CyclicIriMapping,
                    format!("term '{}' depends on itself", term),
                ));
            }
            None => {}
        }
        if term.is_empty() {
            return Err(JsonLdError::new(
                ErrorCode::InvalidTermDefinition,
                "a term must not be the empty string",
            ));
        }
        defined.insert(term.to_string(), false);

        let raw = local.get(term).unwrap_or(&Value::Null);

        if term == "@type" {
            if self.is_json_ld_10() {
                return Err(JsonLdError::new(
                    ErrorCode::KeywordRedefinition,
                    "@type cannot be redefined in json-ld-1.0 processing mode",
                ));
            }
            validate_type_redefinition(raw)?;
        } else if is_keyword(term) {
            return Err(JsonLdError::new(
                ErrorCode::KeywordRedefinition,
                format!("keyword '{}' cannot be redefined", term),
            ));
        } else if matches_keyword_production(term) {
            self.warn(
                ErrorCode::InvalidTermDefinition,
                format!("term '{}' has the form of a keyword and is ignored", term),
            );
            defined.insert(term.to_string(), true);
            return Ok(());
        }

        let previous = active.remove_term(term);

        let (value, simple_term) = match raw {
            Value::Null => (Map::from_iter([("@id".to_string(), Value::Null)]), false),
            Value::String(_) => (Map::from_iter([("@id".to_string(), raw.clone())]), true),
            Value::Object(map) => (map.clone(), false),
            other => {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTermDefinition,
                    format!("definition of '{}' must be a string, map or null, found {}", term, other),
                ));
            }
        };

        let mut definition = TermDefinition {
            protected: scope.protected,
            ..TermDefinition::default()
        };

        if let Some(protected) = value.get("@protected") {
            self.require_json_ld_11("@protected", ErrorCode::ProcessingModeConflict)?;
            definition.protected = protected.as_bool().ok_or_else(|| {
                JsonLdError::new(
                    ErrorCode::InvalidProtectedValue,
                    format!("@protected of '{}' must be a boolean", term),
                )
            })?;
        }

        if let Some(type_value) = value.get("@type") {
            let Value::String(type_value) = type_value else {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTypeMapping,
                    format!("@type of '{}' must be a string", term),
                ));
            };
            let expanded = self
                .expand_iri(active, type_value, true, false, local, defined, scope)?
                .unwrap_or_default();
            let keyword_type = matches!(expanded.as_str(), "@id" | "@vocab" | "@json" | "@none");
            if self.is_json_ld_10() && matches!(expanded.as_str(), "@json" | "@none") {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTypeMapping,
                    format!("@type '{}' of '{}' requires json-ld-1.1", expanded, term),
                ));
            }
            if !keyword_type && !is_absolute_iri(&expanded) {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTypeMapping,
                    format!("@type of '{}' expands to '{}', which is not an IRI", term, expanded),
                ));
            }
            definition.type_mapping = Some(expanded);
        }

        if let Some(reverse) = value.get("@reverse") {
            if value.contains_key("@id") || value.contains_key("@nest") {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidReverseProperty,
                    format!("reverse property '{}' must not have @id or @nest", term),
                ));
            }
            let Value::String(reverse) = reverse else {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidIriMapping,
                    format!("@reverse of '{}' must be a string", term),
                ));
            };
            if matches_keyword_production(reverse) {
                self.warn(
                    ErrorCode::InvalidIriMapping,
                    format!("@reverse of '{}' has the form of a keyword and is ignored", term),
                );
                defined.insert(term.to_string(), true);
                return Ok(());
            }
            let iri = self
                .expand_iri(active, reverse, true, false, local, defined, scope)?
                .filter(|iri| is_absolute_iri(iri) || is_blank_node_identifier(iri))
                .ok_or_else(|| {
                    JsonLdError::new(
                        ErrorCode::InvalidIriMapping,
                        format!("@reverse of '{}' does not expand to an IRI", term),
                    )
                })?;
            definition.iri_mapping = Some(iri);

            match value.get("@container") {
                None | Some(Value::Null) => {}
                Some(Value::String(container)) if container == "@set" => {
                    definition.container_mapping.insert(Container::Set);
                }
                Some(Value::String(container)) if container == "@index" => {
                    definition.container_mapping.insert(Container::Index);
                }
                Some(other) => {
                    return Err(JsonLdError::new(
                        ErrorCode::InvalidReverseProperty,
                        format!("reverse property '{}' only supports @set or @index containers, found {}", term, other),
                    ));
                }
            }
            definition.reverse = true;
            return self.store_definition(active, term, definition, previous, &value, defined, scope);
        }

        match value.get("@id") {
            Some(id) if id.as_str() != Some(term) => {
                if !id.is_null() {
                    let Value::String(id) = id else {
                        return Err(JsonLdError::new(
                            ErrorCode::InvalidIriMapping,
                            format!("@id of '{}' must be a string", term),
                        ));
                    };
                    if !is_keyword(id) && matches_keyword_production(id) {
                        self.warn(
                            ErrorCode::InvalidIriMapping,
                            format!("@id of '{}' has the form of a keyword and is ignored", term),
                        );
                        defined.insert(term.to_string(), true);
                        return Ok(());
                    }
                    let iri = self
                        .expand_iri(active, id, true, false, local, defined, scope)?
                        .filter(|iri| is_keyword(iri) || is_absolute_iri(iri) || is_blank_node_identifier(iri))
                        .ok_or_else(|| {
                            JsonLdError::new(
                                ErrorCode::InvalidIriMapping,
                                format!("@id of '{}' does not expand to a keyword or IRI", term),
                            )
                        })?;
                    if iri == "@context" {
                        return Err(JsonLdError::new(
                            ErrorCode::InvalidKeywordAlias,
                            format!("'{}' cannot alias @context", term),
                        ));
                    }

                    let inner_colon = term
                        .char_indices()
                        .any(|(i, c)| c == ':' && i > 0 && i + 1 < term.len());
                    if inner_colon || term.contains('/') {
                        defined.insert(term.to_string(), true);
                        let own = self.expand_iri(active, term, true, false, local, defined, scope)?;
                        if own.as_deref() != Some(iri.as_str()) {
                            return Err(JsonLdError::new(
                                ErrorCode::InvalidIriMapping,
                                format!(
                                    "'{}' expands to '{}' but its @id expands to '{}'",
                                    term,
                                    own.unwrap_or_default(),
                                    iri
                                ),
                            ));
                        }
                    }

                    if simple_term
                        && !term.contains(':')
                        && !term.contains('/')
                        && (ends_with_gen_delim(&iri) || is_blank_node_identifier(&iri))
                    {
                        definition.prefix = true;
                    }
                    definition.iri_mapping = Some(iri);
                }
            }
            _ => {
                definition.iri_mapping = Some(self.implicit_iri_mapping(active, local, term, defined, scope)?);
            }
        }

        if let Some(container) = value.get("@container") {
            definition.container_mapping = self.container_mapping(term, container)?;
            if definition.has_container(Container::Type) {
                match definition.type_mapping.as_deref() {
                    None => definition.type_mapping = Some("@id".to_string()),
                    Some("@id") | Some("@vocab") => {}
                    Some(other) => {
                        return Err(JsonLdError::new(
                            ErrorCode::InvalidTypeMapping,
                            format!("'{}' has an @type container but type mapping '{}'", term, other),
                        ));
                    }
                }
            }
        }

        if let Some(index) = value.get("@index") {
            if self.is_json_ld_10() || !definition.has_container(Container::Index) {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTermDefinition,
                    format!("@index on '{}' requires an @index container in json-ld-1.1", term),
                ));
            }
            let index = index
                .as_str()
                .filter(|index| !is_keyword(index))
                .filter(|index| {
                    active
                        .expand_iri(index, true, false)
                        .is_some_and(|iri| is_absolute_iri(&iri))
                })
                .ok_or_else(|| {
                    JsonLdError::new(
                        ErrorCode::InvalidTermDefinition,
                        format!("@index of '{}' must expand to an IRI", term),
                    )
                })?;
            definition.index_mapping = Some(index.to_string());
        }

        if let Some(scoped) = value.get("@context") {
            if self.is_json_ld_10() {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTermDefinition,
                    format!("scoped context on '{}' requires json-ld-1.1", term),
                ));
            }
            let snapshot = Arc::new(active.clone());
            let flags = ContextFlags {
                override_protected: true,
                propagate: true,
                validate_scoped_context: false,
            };
            self.process(&snapshot, scoped, scope.base_url, flags)
                .map_err(|e| {
                    JsonLdError::scoped(
                        ErrorCode::InvalidScopedContext,
                        format!("scoped context of '{}' is invalid", term),
                        e,
                    )
                })?;
            definition.local_context = Some(scoped.clone());
            definition.base_url = scope.base_url.map(str::to_string);
        }

        if !value.contains_key("@type") {
            if let Some(language) = value.get("@language") {
                definition.language_mapping = Some(match language {
                    Value::Null => None,
                    Value::String(tag) => {
                        if !is_well_formed_language_tag(tag) {
                            self.warn(
                                ErrorCode::MalformedLanguageTag,
                                format!("@language '{}' of '{}' is not a well-formed language tag", tag, term),
                            );
                        }
                        Some(tag.to_lowercase())
                    }
                    other => {
                        return Err(JsonLdError::new(
                            ErrorCode::InvalidLanguageMapping,
                            format!("@language of '{}' must be a string or null, found {}", term, other),
                        ));
                    }
                });
            }

            if let Some(direction) = value.get("@direction") {
                definition.direction_mapping = Some(match direction {
                    Value::Null => Direction::None,
                    Value::String(dir) => parse_direction(dir).ok_or_else(|| {
                        JsonLdError::new(
                            ErrorCode::InvalidBaseDirection,
                            format!("@direction of '{}' must be 'ltr', 'rtl' or null", term),
                        )
                    })?,
                    other => {
                        return Err(JsonLdError::new(
                            ErrorCode::InvalidBaseDirection,
                            format!("@direction of '{}' must be a string or null, found {}", term, other),
                        ));
                    }
                });
            }
        }

        if let Some(nest) = value.get("@nest") {
            if self.is_json_ld_10() {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTermDefinition,
                    format!("@nest on '{}' requires json-ld-1.1", term),
                ));
            }
            let nest = nest
                .as_str()
                .filter(|nest| !is_keyword(nest) || *nest == "@nest")
                .ok_or_else(|| {
                    JsonLdError::new(
                        ErrorCode::InvalidNestValue,
                        format!("@nest of '{}' must be a string other than a keyword", term),
                    )
                })?;
            definition.nest = Some(nest.to_string());
        }

        if let Some(prefix) = value.get("@prefix") {
            if self.is_json_ld_10() || term.contains(':') || term.contains('/') {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTermDefinition,
                    format!("'{}' cannot declare @prefix", term),
                ));
            }
            definition.prefix = prefix.as_bool().ok_or_else(|| {
                JsonLdError::new(
                    ErrorCode::InvalidPrefixValue,
                    format!("@prefix of '{}' must be a boolean", term),
                )
            })?;
            if definition.prefix && definition.iri_mapping.as_deref().is_some_and(is_keyword) {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidTermDefinition,
                    format!("keyword alias '{}' cannot be a prefix", term),
                ));
            }
        }

        self.store_definition(active, term, definition, previous, &value, defined, scope)
    }

    /// IRI mapping for a term without an explicit `@id`: compact IRI, IRI,
    /// relative IRI, `@type` or vocabulary relative.
    fn implicit_iri_mapping(
        &mut self,
        active: &mut ActiveContext,
        local: &Map<String, Value>,
        term: &str,
        defined: &mut HashMap<String, bool>,
        scope: &TermScope<'_>,
    ) -> Result<String, JsonLdError> {
        if has_inner_colon(term) {
            if let Some((prefix, suffix)) = split_compact_iri(term) {
                if local.contains_key(prefix) {
                    self.create_term_definition(active, local, prefix, defined, scope)?;
                }
                if let Some(iri) = active
                    .get_term(prefix, false)
                    .and_then(|definition| definition.iri_mapping.as_deref())
                {
                    return Ok(format!("{}{}", iri, suffix));
                }
            }
            return Ok(term.to_string());
        }

        if term.contains('/') {
            return active
                .expand_iri(term, true, false)
                .filter(|iri| is_iri(iri))
                .ok_or_else(|| {
                    JsonLdError::new(
                        ErrorCode::InvalidIriMapping,
                        format!("relative term '{}' does not expand to an IRI", term),
                    )
                });
        }

        if term == "@type" {
            return Ok("@type".to_string());
        }

        match active.vocab() {
            Some(vocab) => Ok(format!("{}{}", vocab, term)),
            None => Err(JsonLdError::new(
                ErrorCode::InvalidIriMapping,
                format!("term '{}' has no IRI mapping and no @vocab is set", term),
            )),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn store_definition(
        &mut self,
        active: &mut ActiveContext,
        term: &str,
        definition: TermDefinition,
        previous: Option<Arc<TermDefinition>>,
        value: &Map<String, Value>,
        defined: &mut HashMap<String, bool>,
        scope: &TermScope<'_>,
    ) -> Result<(), JsonLdError> {
        if let Some(unknown) = value
            .keys()
            .find(|key| !TERM_DEFINITION_KEYS.contains(&key.as_str()))
        {
            return Err(JsonLdError::new(
                ErrorCode::InvalidTermDefinition,
                format!("definition of '{}' has unknown entry '{}'", term, unknown),
            ));
        }

        let definition: Arc<TermDefinition> = match previous {
            Some(previous) if !scope.override_protected && previous.protected => {
                if !definition.equivalent_to(&previous) {
                    return Err(JsonLdError::new(
                        ErrorCode::ProtectedTermRedefinition,
                        format!("protected term '{}' cannot be redefined", term),
                    ));
                }
                previous
            }
            _ => Arc::new(definition),
        };

        active.set_term(term, definition);
        defined.insert(term.to_string(), true);
        Ok(())
    }

    fn container_mapping(&self, term: &str, container: &Value) -> Result<BTreeSet<Container>, JsonLdError> {
        let invalid = |detail: String| {
            JsonLdError::new(
                ErrorCode::InvalidContainerMapping,
                format!("@container of '{}' {}", term, detail),
            )
        };

        let keywords: Vec<&str> = match container {
            Value::String(keyword) => vec![keyword.as_str()],
            Value::Array(_) if self.is_json_ld_10() => {
                return Err(invalid("cannot be an array in json-ld-1.0".to_string()));
            }
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().ok_or_else(|| invalid("must only contain strings".to_string())))
                .collect::<Result<_, _>>()?,
            other => return Err(invalid(format!("must be a string or array, found {}", other))),
        };

        let mut containers = BTreeSet::new();
        for keyword in keywords {
            let parsed = Container::from_keyword(keyword)
                .ok_or_else(|| invalid(format!("has unknown value '{}'", keyword)))?;
            if self.is_json_ld_10() && matches!(parsed, Container::Graph | Container::Id | Container::Type) {
                return Err(invalid(format!("'{}' requires json-ld-1.1", keyword)));
            }
            containers.insert(parsed);
        }

        if !is_valid_container_combination(&containers) {
            return Err(invalid("has an invalid combination of containers".to_string()));
        }
        Ok(containers)
    }

    // === IRI Expansion ===

    /// IRI expansion while a local context is being processed. Terms the
    /// value depends on are defined first.
    #[allow(clippy::too_many_arguments)]
    fn expand_iri(
        &mut self,
        active: &mut ActiveContext,
        value: &str,
        vocab: bool,
        document_relative: bool,
        local: &Map<String, Value>,
        defined: &mut HashMap<String, bool>,
        scope: &TermScope<'_>,
    ) -> Result<Option<String>, JsonLdError> {
        if is_keyword(value) {
            return Ok(Some(value.to_string()));
        }
        if matches_keyword_production(value) {
            self.warn(
                ErrorCode::InvalidIriMapping,
                format!("'{}' has the form of a keyword and expands to nothing", value),
            );
            return Ok(None);
        }

        if local.contains_key(value) && defined.get(value) != Some(&true) {
            self.create_term_definition(active, local, value, defined, scope)?;
        }
        if has_inner_colon(value)
            && let Some((prefix, _)) = split_compact_iri(value)
            && local.contains_key(prefix)
            && defined.get(prefix) != Some(&true)
        {
            self.create_term_definition(active, local, prefix, defined, scope)?;
        }

        Ok(active.expand_iri(value, vocab, document_relative))
    }
}

fn validate_type_redefinition(value: &Value) -> Result<(), JsonLdError> {
    let valid = match value {
        Value::Object(map) if !map.is_empty() => map.iter().all(|(key, value)| match key.as_str() {
            "@container" => value.as_str() == Some("@set"),
            "@protected" => true,
            _ => false,
        }),
        _ => false,
    };
    if !valid {
        return Err(JsonLdError::new(
            ErrorCode::KeywordRedefinition,
            "@type may only be redefined with @container: @set and @protected",
        ));
    }
    Ok(())
}

/// `@list` stands alone; `@graph` combines with one of `@id`/`@index` and
/// optionally `@set`; otherwise `@set` pairs with at most one other container.
fn is_valid_container_combination(containers: &BTreeSet<Container>) -> bool {
    if containers.len() <= 1 {
        return true;
    }
    if containers.contains(&Container::List) {
        return false;
    }
    if containers.contains(&Container::Graph) {
        let id_and_index =
            containers.contains(&Container::Id) && containers.contains(&Container::Index);
        let others_allowed = containers
            .iter()
            .all(|c| matches!(c, Container::Graph | Container::Id | Container::Index | Container::Set));
        return others_allowed && !id_and_index;
    }
    containers.contains(&Container::Set) && containers.len() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_fetcher::tests::StaticLoader;
    use serde_json::json;

    fn process_with(
        options: &ProcessorOptions,
        provider: &mut RemoteContextProvider,
        local: Value,
    ) -> Result<ActiveContext, JsonLdError> {
        let base = options.base.clone();
        let mut processor = ContextProcessor::new(options, provider);
        processor.process_context(&Arc::new(ActiveContext::new(base.clone())), &local, base.as_deref())
    }

    fn process(local: Value) -> Result<ActiveContext, JsonLdError> {
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        process_with(&options, &mut provider, local)
    }

    fn iri_of(context: &ActiveContext, term: &str) -> Option<String> {
        context.get_term(term, false).and_then(|d| d.iri_mapping.clone())
    }

    fn error_code(local: Value) -> ErrorCode {
        process(local).unwrap_err().code()
    }

    // === simple and expanded term definitions ===

    #[test]
    fn every_term_is_stored_with_its_iri() {
        let context = process(json!({
            "name": "http://schema.org/name",
            "homepage": {"@id": "http://schema.org/url", "@type": "@id"},
            "knows": {"@id": "http://xmlns.com/foaf/0.1/knows", "@container": "@set"}
        }))
        .unwrap();
        assert_eq!(context.term_count(), 3);
        assert_eq!(iri_of(&context, "name").as_deref(), Some("http://schema.org/name"));
        assert_eq!(iri_of(&context, "homepage").as_deref(), Some("http://schema.org/url"));
        let homepage = context.get_term("homepage", false).unwrap();
        assert_eq!(homepage.type_mapping.as_deref(), Some("@id"));
        let knows = context.get_term("knows", false).unwrap();
        assert!(knows.has_container(Container::Set));
    }

    #[test]
    fn compact_iri_terms_use_prefix_in_any_order() {
        let context = process(json!({
            "name": "schema:name",
            "schema": "http://schema.org/",
            "schema:Person": {"@type": "@id"}
        }))
        .unwrap();
        assert_eq!(iri_of(&context, "name").as_deref(), Some("http://schema.org/name"));
        assert_eq!(
            iri_of(&context, "schema:Person").as_deref(),
            Some("http://schema.org/Person")
        );
        assert!(context.get_term("schema", false).unwrap().prefix);
    }

    #[test]
    fn vocab_relative_terms() {
        let context = process(json!({
            "@vocab": "http://vocab.ex/",
            "Person": {"@type": "@id"}
        }))
        .unwrap();
        assert_eq!(context.vocab(), Some("http://vocab.ex/"));
        assert_eq!(iri_of(&context, "Person").as_deref(), Some("http://vocab.ex/Person"));
    }

    #[test]
    fn term_without_iri_and_vocab_fails() {
        assert_eq!(error_code(json!({"Person": {"@type": "@id"}})), ErrorCode::InvalidIriMapping);
    }

    #[test]
    fn null_term_is_inert() {
        let context = process(json!({"ignored": null})).unwrap();
        assert!(context.has_term("ignored"));
        assert!(context.get_term("ignored", false).unwrap().is_inert());
    }

    #[test]
    fn keyword_alias() {
        let context = process(json!({"id": "@id", "type": "@type"})).unwrap();
        assert_eq!(context.expand_iri("id", false, false).as_deref(), Some("@id"));
        assert_eq!(iri_of(&context, "type").as_deref(), Some("@type"));
    }

    #[test]
    fn keyword_like_term_is_ignored_with_warning() {
        let options = ProcessorOptions::default().with_safe_mode(true);
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let mut processor = ContextProcessor::new(&options, &mut provider);
        let context = processor
            .process_context(
                &Arc::new(ActiveContext::default()),
                &json!({"@ignoreMe": "http://ex/ignored", "ok": "http://ex/ok"}),
                None,
            )
            .unwrap();
        assert!(!context.has_term("@ignoreMe"));
        assert!(context.has_term("ok"));
        assert_eq!(processor.warnings().len(), 1);
        assert_eq!(processor.warnings()[0].code, ErrorCode::InvalidTermDefinition);
    }

    #[test]
    fn warnings_are_not_collected_outside_safe_mode() {
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let mut processor = ContextProcessor::new(&options, &mut provider);
        processor
            .process_context(&Arc::new(ActiveContext::default()), &json!({"@language": "en_US"}), None)
            .unwrap();
        assert!(processor.into_warnings().is_empty());
    }

    #[test]
    fn malformed_language_tag_warns() {
        let options = ProcessorOptions::default().with_safe_mode(true);
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let mut processor = ContextProcessor::new(&options, &mut provider);
        let context = processor
            .process_context(&Arc::new(ActiveContext::default()), &json!({"@language": "en_US"}), None)
            .unwrap();
        assert_eq!(context.language(), Some("en_us"));
        let warnings = processor.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, ErrorCode::MalformedLanguageTag);
    }

    // === term definition errors ===

    #[test]
    fn cyclic_definitions_fail() {
        assert_eq!(
            error_code(json!({"a": "b:x", "b": "a:y"})),
            ErrorCode::CyclicIriMapping
        );
        assert_eq!(
            error_code(json!({"a": {"@id": "b"}, "b": {"@id": "a"}})),
            ErrorCode::CyclicIriMapping
        );
    }

    #[test]
    fn empty_term_fails() {
        assert_eq!(error_code(json!({"": "http://ex/empty"})), ErrorCode::InvalidTermDefinition);
    }

    #[test]
    fn keyword_redefinition_fails() {
        assert_eq!(error_code(json!({"@id": "http://ex/id"})), ErrorCode::KeywordRedefinition);
        assert_eq!(
            error_code(json!({"@type": {"@id": "http://ex/type"}})),
            ErrorCode::KeywordRedefinition
        );
    }

    #[test]
    fn type_may_be_redefined_as_set() {
        let context = process(json!({"@type": {"@container": "@set"}})).unwrap();
        let definition = context.get_term("@type", false).unwrap();
        assert_eq!(definition.iri_mapping.as_deref(), Some("@type"));
        assert!(definition.has_container(Container::Set));
    }

    #[test]
    fn alias_of_context_fails() {
        assert_eq!(error_code(json!({"ctx": "@context"})), ErrorCode::InvalidKeywordAlias);
    }

    #[test]
    fn invalid_type_mapping_fails() {
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@type": 5}})),
            ErrorCode::InvalidTypeMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@type": "_:b0"}})),
            ErrorCode::InvalidTypeMapping
        );
    }

    #[test]
    fn compact_iri_term_must_match_its_id() {
        assert_eq!(
            error_code(json!({"ex": "http://ex/", "ex:a": {"@id": "http://other/a"}})),
            ErrorCode::InvalidIriMapping
        );
    }

    #[test]
    fn non_ascii_prefix_expands() {
        let context = process(json!({
            "é": "http://ex/e#",
            "name": "é:name",
            "é:knows": {"@type": "@id"}
        }))
        .unwrap();
        assert_eq!(iri_of(&context, "name").as_deref(), Some("http://ex/e#name"));
        assert_eq!(iri_of(&context, "é:knows").as_deref(), Some("http://ex/e#knows"));
        assert_eq!(
            context.expand_iri("é:other", true, false).as_deref(),
            Some("http://ex/e#other")
        );
    }

    #[test]
    fn unknown_definition_key_fails() {
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@foo": true}})),
            ErrorCode::InvalidTermDefinition
        );
    }

    #[test]
    fn non_map_definition_fails() {
        assert_eq!(error_code(json!({"p": 42})), ErrorCode::InvalidTermDefinition);
    }

    // === reverse properties ===

    #[test]
    fn reverse_property() {
        let context = process(json!({
            "children": {"@reverse": "http://ex/parent", "@container": "@set"}
        }))
        .unwrap();
        let children = context.get_term("children", false).unwrap();
        assert!(children.reverse);
        assert_eq!(children.iri_mapping.as_deref(), Some("http://ex/parent"));
        assert!(children.has_container(Container::Set));
    }

    #[test]
    fn reverse_property_errors() {
        assert_eq!(
            error_code(json!({"c": {"@reverse": "http://ex/p", "@id": "http://ex/q"}})),
            ErrorCode::InvalidReverseProperty
        );
        assert_eq!(
            error_code(json!({"c": {"@reverse": "http://ex/p", "@container": "@list"}})),
            ErrorCode::InvalidReverseProperty
        );
        assert_eq!(error_code(json!({"c": {"@reverse": 1}})), ErrorCode::InvalidIriMapping);
    }

    // === containers ===

    #[test]
    fn container_combinations() {
        let context = process(json!({
            "g": {"@id": "http://ex/g", "@container": ["@graph", "@index", "@set"]},
            "t": {"@id": "http://ex/t", "@container": "@type"},
            "l": {"@id": "http://ex/l", "@container": "@list"}
        }))
        .unwrap();
        assert_eq!(context.get_term("g", false).unwrap().container_key(), "@graph@index@set");
        assert_eq!(
            context.get_term("t", false).unwrap().type_mapping.as_deref(),
            Some("@id")
        );
        assert!(context.get_term("l", false).unwrap().has_container(Container::List));
    }

    #[test]
    fn invalid_container_combinations_fail() {
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@container": ["@list", "@set"]}})),
            ErrorCode::InvalidContainerMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@container": ["@graph", "@id", "@index"]}})),
            ErrorCode::InvalidContainerMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@container": "@foo"}})),
            ErrorCode::InvalidContainerMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@container": ["@index", "@language", "@set"]}})),
            ErrorCode::InvalidContainerMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@container": ["@id", "@type", "@set"]}})),
            ErrorCode::InvalidContainerMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@container": "@type", "@type": "http://ex/T"}})),
            ErrorCode::InvalidTypeMapping
        );
    }

    #[test]
    fn index_mapping_requires_index_container() {
        let context = process(json!({
            "p": {"@id": "http://ex/p", "@container": "@index", "@index": "http://ex/prop"}
        }))
        .unwrap();
        assert_eq!(
            context.get_term("p", false).unwrap().index_mapping.as_deref(),
            Some("http://ex/prop")
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@index": "http://ex/prop"}})),
            ErrorCode::InvalidTermDefinition
        );
    }

    // === language, direction, nest, prefix ===

    #[test]
    fn language_and_direction_mappings() {
        let context = process(json!({
            "label": {"@id": "http://ex/label", "@language": "EN", "@direction": "rtl"},
            "plain": {"@id": "http://ex/plain", "@language": null, "@direction": null},
            "typed": {"@id": "http://ex/typed", "@type": "@id", "@language": "en"}
        }))
        .unwrap();
        let label = context.get_term("label", false).unwrap();
        assert_eq!(label.language_mapping, Some(Some("en".to_string())));
        assert_eq!(label.direction_mapping, Some(Direction::Rtl));
        let plain = context.get_term("plain", false).unwrap();
        assert_eq!(plain.language_mapping, Some(None));
        assert_eq!(plain.direction_mapping, Some(Direction::None));
        assert_eq!(context.get_term("typed", false).unwrap().language_mapping, None);
    }

    #[test]
    fn invalid_language_and_direction_fail() {
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@language": 1}})),
            ErrorCode::InvalidLanguageMapping
        );
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@direction": "up"}})),
            ErrorCode::InvalidBaseDirection
        );
    }

    #[test]
    fn nest_values() {
        let context = process(json!({"p": {"@id": "http://ex/p", "@nest": "@nest"}})).unwrap();
        assert_eq!(context.get_term("p", false).unwrap().nest.as_deref(), Some("@nest"));
        assert_eq!(
            error_code(json!({"p": {"@id": "http://ex/p", "@nest": "@id"}})),
            ErrorCode::InvalidNestValue
        );
    }

    #[test]
    fn prefix_flag() {
        let context = process(json!({"ex": {"@id": "http://ex/ns", "@prefix": true}})).unwrap();
        assert!(context.get_term("ex", false).unwrap().prefix);
        assert_eq!(
            error_code(json!({"ex": {"@id": "http://ex/ns", "@prefix": "yes"}})),
            ErrorCode::InvalidPrefixValue
        );
        assert_eq!(
            error_code(json!({"ex:a": {"@prefix": true}})),
            ErrorCode::InvalidTermDefinition
        );
        assert_eq!(
            error_code(json!({"id": {"@id": "@id", "@prefix": true}})),
            ErrorCode::InvalidTermDefinition
        );
    }

    #[test]
    fn simple_term_prefix_needs_gen_delim() {
        let context = process(json!({"ex": "http://ex/ns#", "noprefix": "http://ex/ns"})).unwrap();
        assert!(context.get_term("ex", false).unwrap().prefix);
        assert!(!context.get_term("noprefix", false).unwrap().prefix);
    }

    // === context-level entries ===

    #[test]
    fn base_entry() {
        let options = ProcessorOptions::default().with_base("http://ex/dir/doc");
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let context = process_with(&options, &mut provider, json!({"@base": "sub/"})).unwrap();
        assert_eq!(context.base(), Some("http://ex/dir/sub/"));
        assert_eq!(context.original_base(), Some("http://ex/dir/doc"));

        let cleared = process_with(&options, &mut provider, json!({"@base": null})).unwrap();
        assert_eq!(cleared.base(), None);

        let err = process(json!({"@base": "relative"})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidBaseIri);
    }

    #[test]
    fn vocab_entry_errors() {
        assert_eq!(error_code(json!({"@vocab": 5})), ErrorCode::InvalidVocabMapping);
        let context = process(json!({"@vocab": "_:"})).unwrap();
        assert_eq!(context.vocab(), Some("_:"));
    }

    #[test]
    fn default_language_and_direction() {
        let context = process(json!({"@language": "DE", "@direction": "ltr"})).unwrap();
        assert_eq!(context.language(), Some("de"));
        assert_eq!(context.base_direction(), Some(Direction::Ltr));
        assert_eq!(error_code(json!({"@language": 1})), ErrorCode::InvalidDefaultLanguage);
        assert_eq!(error_code(json!({"@direction": "up"})), ErrorCode::InvalidBaseDirection);
    }

    #[test]
    fn version_entry() {
        let context = process(json!({"@version": 1.1})).unwrap();
        assert_eq!(context.version(), Some(ProcessingMode::JsonLd11));
        assert_eq!(error_code(json!({"@version": "1.1"})), ErrorCode::InvalidVersionValue);

        let options = ProcessorOptions::default().with_processing_mode(ProcessingMode::JsonLd10);
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let err = process_with(&options, &mut provider, json!({"@version": 1.1})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProcessingModeConflict);
    }

    #[test]
    fn json_ld_10_rejects_11_features() {
        let options = ProcessorOptions::default().with_processing_mode(ProcessingMode::JsonLd10);
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let cases = [
            (json!({"@direction": "ltr"}), ErrorCode::InvalidContextEntry),
            (json!({"@import": "http://ex/ctx"}), ErrorCode::InvalidContextEntry),
            (json!({"@type": {"@container": "@set"}}), ErrorCode::KeywordRedefinition),
            (
                json!({"p": {"@id": "http://ex/p", "@container": "@id"}}),
                ErrorCode::InvalidContainerMapping,
            ),
            (
                json!({"p": {"@id": "http://ex/p", "@context": {}}}),
                ErrorCode::InvalidTermDefinition,
            ),
        ];
        for (local, expected) in cases {
            let err = process_with(&options, &mut provider, local).unwrap_err();
            assert_eq!(err.code(), expected);
        }
    }

    #[test]
    fn invalid_local_context_fails() {
        assert_eq!(error_code(json!(42)), ErrorCode::InvalidLocalContext);
        assert_eq!(error_code(json!({"@propagate": "no"})), ErrorCode::InvalidPropagateValue);
        assert_eq!(error_code(json!({"@protected": "yes"})), ErrorCode::InvalidProtectedValue);
    }

    // === scoping ===

    #[test]
    fn null_resets_context() {
        let options = ProcessorOptions::default().with_base("http://ex/doc");
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let context = process_with(
            &options,
            &mut provider,
            json!([{"@vocab": "http://vocab/", "a": "http://ex/a"}, null, {"b": "http://ex/b"}]),
        )
        .unwrap();
        assert!(!context.has_term("a"));
        assert!(context.has_term("b"));
        assert_eq!(context.vocab(), None);
        assert_eq!(context.base(), Some("http://ex/doc"));
    }

    #[test]
    fn protected_terms_block_nullification_and_redefinition() {
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let mut processor = ContextProcessor::new(&options, &mut provider);
        let protected = Arc::new(
            processor
                .process_context(
                    &Arc::new(ActiveContext::default()),
                    &json!({"@protected": true, "name": "http://schema.org/name"}),
                    None,
                )
                .unwrap(),
        );
        assert!(protected.get_term("name", false).unwrap().protected);

        let err = processor.process_context(&protected, &Value::Null, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidContextNullification);

        let err = processor
            .process_context(&protected, &json!({"name": "http://ex/other"}), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProtectedTermRedefinition);

        // Identical redefinition keeps the protected definition.
        let same = processor
            .process_context(&protected, &json!({"name": "http://schema.org/name"}), None)
            .unwrap();
        assert!(Arc::ptr_eq(
            same.get_term("name", false).unwrap(),
            protected.get_term("name", false).unwrap()
        ));

        let overridden = processor
            .process_context_with(
                &protected,
                &json!({"name": "http://ex/other"}),
                None,
                ContextFlags {
                    override_protected: true,
                    ..ContextFlags::default()
                },
            )
            .unwrap();
        assert_eq!(iri_of(&overridden, "name").as_deref(), Some("http://ex/other"));
    }

    #[test]
    fn failed_scope_leaves_outer_context_usable() {
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let mut processor = ContextProcessor::new(&options, &mut provider);
        let outer = Arc::new(
            processor
                .process_context(&Arc::new(ActiveContext::default()), &json!({"a": "http://ex/a"}), None)
                .unwrap(),
        );
        assert!(processor.process_context(&outer, &json!({"b": 1}), None).is_err());
        assert_eq!(iri_of(&outer, "a").as_deref(), Some("http://ex/a"));
        assert!(!outer.has_term("b"));
    }

    #[test]
    fn non_propagated_context_records_previous() {
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(Arc::new(StaticLoader::default()));
        let mut processor = ContextProcessor::new(&options, &mut provider);
        let outer = Arc::new(ActiveContext::default());
        let scoped = processor
            .process_context(&outer, &json!({"@propagate": false, "a": "http://ex/a"}), None)
            .unwrap();
        assert!(Arc::ptr_eq(scoped.previous_context().unwrap(), &outer));

        let propagated = processor
            .process_context(&outer, &json!({"a": "http://ex/a"}), None)
            .unwrap();
        assert!(propagated.previous_context().is_none());
    }

    #[test]
    fn scoped_context_is_validated_and_stored() {
        let context = process(json!({
            "Person": {"@id": "http://schema.org/Person", "@context": {"name": "http://schema.org/name"}}
        }))
        .unwrap();
        let person = context.get_term("Person", false).unwrap();
        assert_eq!(person.local_context, Some(json!({"name": "http://schema.org/name"})));
        assert!(!context.has_term("name"));

        let err = process(json!({"p": {"@id": "http://ex/p", "@context": {"q": 1}}})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidScopedContext);
        match err {
            JsonLdError::Scoped { source, .. } => {
                assert_eq!(source.code(), ErrorCode::InvalidTermDefinition)
            }
            other => panic!("Expected Scoped error, got: {:?}", other),
        }
    }

    // === remote contexts ===

    #[test]
    fn remote_context_is_loaded_and_cached() {
        let loader = Arc::new(StaticLoader::default().with(
            "http://ex/ctx",
            json!({"@context": {"name": "http://schema.org/name"}}),
        ));
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(loader.clone());
        let context = process_with(
            &options,
            &mut provider,
            json!(["http://ex/ctx", "http://ex/ctx"]),
        )
        .unwrap();
        assert_eq!(iri_of(&context, "name").as_deref(), Some("http://schema.org/name"));
        assert_eq!(loader.request_count(), 1);
    }

    #[test]
    fn relative_reference_resolves_against_base() {
        let loader = Arc::new(StaticLoader::default().with(
            "http://ex/contexts/main.jsonld",
            json!({"@context": ["shared.jsonld", {"a": "http://ex/a"}]}),
        ).with(
            "http://ex/contexts/shared.jsonld",
            json!({"@context": {"b": "http://ex/b"}}),
        ));
        let options = ProcessorOptions::default().with_base("http://ex/contexts/doc");
        let mut provider = RemoteContextProvider::new(loader);
        let context = process_with(&options, &mut provider, json!("main.jsonld")).unwrap();
        assert!(context.has_term("a"));
        assert!(context.has_term("b"));
    }

    #[test]
    fn unresolvable_reference_fails() {
        assert_eq!(error_code(json!("relative.jsonld")), ErrorCode::LoadingDocumentFailed);
    }

    #[test]
    fn self_including_context_fails() {
        let loader = Arc::new(StaticLoader::default().with(
            "http://ex/loop",
            json!({"@context": ["http://ex/loop", {"a": "http://ex/a"}]}),
        ));
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(loader);
        let err = process_with(&options, &mut provider, json!("http://ex/loop")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecursiveContextInclusion);
    }

    #[test]
    fn recursive_scoped_context_is_skipped_during_validation() {
        let loader = Arc::new(StaticLoader::default().with(
            "http://ex/tree",
            json!({"@context": {"child": {"@id": "http://ex/child", "@context": "http://ex/tree"}}}),
        ));
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(loader.clone());
        let context = process_with(&options, &mut provider, json!("http://ex/tree")).unwrap();
        assert!(context.has_term("child"));
        assert_eq!(loader.request_count(), 1);
    }

    #[test]
    fn zero_limit_never_calls_loader() {
        let loader = Arc::new(StaticLoader::default().with("http://ex/ctx", json!({"@context": {}})));
        let options = ProcessorOptions::default().with_remote_context_limit(0);
        let mut provider = RemoteContextProvider::new(loader.clone());
        let err = process_with(&options, &mut provider, json!("http://ex/ctx")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ContextOverflow);
        assert_eq!(loader.request_count(), 0);
    }

    #[test]
    fn distinct_urls_count_against_limit() {
        let loader = Arc::new(
            StaticLoader::default()
                .with("http://ex/a", json!({"@context": {"a": "http://ex/a"}}))
                .with("http://ex/b", json!({"@context": {"b": "http://ex/b"}})),
        );
        let options = ProcessorOptions::default().with_remote_context_limit(1);
        let mut provider = RemoteContextProvider::new(loader);
        let ok = process_with(&options, &mut provider, json!(["http://ex/a", "http://ex/a"]));
        assert!(ok.is_ok());
        let err = process_with(&options, &mut provider, json!(["http://ex/a", "http://ex/b"])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ContextOverflow);
    }

    #[test]
    fn failed_load_does_not_use_up_limit() {
        let loader = Arc::new(StaticLoader::default().with("http://ex/ctx", json!({"@context": {"a": "http://ex/a"}})));
        let options = ProcessorOptions::default().with_remote_context_limit(1);
        let mut provider = RemoteContextProvider::new(loader);
        let mut processor = ContextProcessor::new(&options, &mut provider);
        let empty = Arc::new(ActiveContext::new(None));

        let err = processor
            .process_context(&empty, &json!("http://ex/missing"), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LoadingRemoteContextFailed);
        assert_eq!(processor.remote_fetch_count(), 0);

        let context = processor
            .process_context(&empty, &json!("http://ex/ctx"), None)
            .unwrap();
        assert!(context.has_term("a"));
        assert_eq!(processor.remote_fetch_count(), 1);
    }

    #[test]
    fn base_inside_remote_context_is_ignored() {
        let loader = Arc::new(StaticLoader::default().with(
            "http://ex/ctx",
            json!({"@context": {"@base": "http://elsewhere/"}}),
        ));
        let options = ProcessorOptions::default().with_base("http://ex/doc");
        let mut provider = RemoteContextProvider::new(loader);
        let context = process_with(&options, &mut provider, json!("http://ex/ctx")).unwrap();
        assert_eq!(context.base(), Some("http://ex/doc"));
    }

    #[test]
    fn remote_failures_propagate() {
        let loader = Arc::new(StaticLoader::default().with("http://ex/bad", json!({"no": "context"})));
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(loader);
        let err = process_with(&options, &mut provider, json!("http://ex/bad")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRemoteContext);
        let err = process_with(&options, &mut provider, json!("http://ex/missing")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LoadingRemoteContextFailed);
    }

    // === @import ===

    #[test]
    fn import_is_overlaid_by_local_entries() {
        let loader = Arc::new(StaticLoader::default().with(
            "http://ex/base-ctx",
            json!({"@context": {"a": "http://ex/imported-a", "b": "http://ex/b"}}),
        ));
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(loader);
        let context = process_with(
            &options,
            &mut provider,
            json!({"@import": "http://ex/base-ctx", "a": "http://ex/local-a"}),
        )
        .unwrap();
        assert_eq!(iri_of(&context, "a").as_deref(), Some("http://ex/local-a"));
        assert_eq!(iri_of(&context, "b").as_deref(), Some("http://ex/b"));
    }

    #[test]
    fn import_errors() {
        let loader = Arc::new(
            StaticLoader::default()
                .with("http://ex/nested", json!({"@context": {"@import": "http://ex/other"}}))
                .with("http://ex/array", json!({"@context": ["http://ex/other"]})),
        );
        let options = ProcessorOptions::default();
        let mut provider = RemoteContextProvider::new(loader);
        let cases = [
            (json!({"@import": 5}), ErrorCode::InvalidImportValue),
            (json!({"@import": "http://ex/nested"}), ErrorCode::InvalidContextEntry),
            (json!({"@import": "http://ex/array"}), ErrorCode::InvalidRemoteContext),
        ];
        for (local, expected) in cases {
            let err = process_with(&options, &mut provider, local).unwrap_err();
            assert_eq!(err.code(), expected);
        }
    }

    // === container combination rules ===

    #[test]
    fn container_combination_rules() {
        let set = |items: &[Container]| items.iter().copied().collect::<BTreeSet<_>>();
        assert!(is_valid_container_combination(&set(&[Container::List])));
        assert!(is_valid_container_combination(&set(&[Container::Graph, Container::Id])));
        assert!(is_valid_container_combination(&set(&[Container::Graph, Container::Set])));
        assert!(is_valid_container_combination(&set(&[Container::Set, Container::Language])));
        assert!(!is_valid_container_combination(&set(&[Container::Id, Container::Index])));
        assert!(!is_valid_container_combination(&set(&[Container::Graph, Container::Type])));
        assert!(!is_valid_container_combination(&set(&[Container::List, Container::Set])));
        assert!(!is_valid_container_combination(&set(&[
            Container::Index,
            Container::Language,
            Container::Set
        ])));
        assert!(!is_valid_container_combination(&set(&[
            Container::Id,
            Container::Type,
            Container::Set
        ])));
    }
}
