use std::fmt;
use std::sync::Arc;

use crate::document_loader::DocumentLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    JsonLd10,
    #[default]
    JsonLd11,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::JsonLd10 => "json-ld-1.0",
            ProcessingMode::JsonLd11 => "json-ld-1.1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfDirection {
    I18nDatatype,
    CompoundLiteral,
}

/// Options shared by every algorithm of one processing run.
#[derive(Clone)]
pub struct ProcessorOptions {
    pub base: Option<String>,
    pub compact_arrays: bool,
    pub compact_to_relative: bool,
    /// `None` falls back to the blocking HTTP loader.
    pub document_loader: Option<Arc<dyn DocumentLoader>>,
    pub expand_context: Option<serde_json::Value>,
    pub ordered: bool,
    pub processing_mode: ProcessingMode,
    pub rdf_direction: Option<RdfDirection>,
    /// Distinct remote URLs a run may fetch. 0 disables remote contexts,
    /// negative values remove the cap.
    pub remote_context_limit: i64,
    pub safe_mode: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        ProcessorOptions {
            base: None,
            compact_arrays: true,
            compact_to_relative: true,
            document_loader: None,
            expand_context: None,
            ordered: false,
            processing_mode: ProcessingMode::JsonLd11,
            rdf_direction: None,
            remote_context_limit: 10,
            safe_mode: false,
        }
    }
}

impl ProcessorOptions {
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_document_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.document_loader = Some(loader);
        self
    }

    pub fn with_expand_context(mut self, context: serde_json::Value) -> Self {
        self.expand_context = Some(context);
        self
    }

    pub fn with_processing_mode(mut self, mode: ProcessingMode) -> Self {
        self.processing_mode = mode;
        self
    }

    pub fn with_remote_context_limit(mut self, limit: i64) -> Self {
        self.remote_context_limit = limit;
        self
    }

    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn with_rdf_direction(mut self, direction: RdfDirection) -> Self {
        self.rdf_direction = Some(direction);
        self
    }

    pub fn is_json_ld_10(&self) -> bool {
        self.processing_mode == ProcessingMode::JsonLd10
    }

    /// Whether fetching one more distinct URL stays within the limit.
    pub(crate) fn allows_remote_fetch(&self, fetched: usize) -> bool {
        match usize::try_from(self.remote_context_limit) {
            Ok(limit) => fetched < limit,
            Err(_) => true,
        }
    }
}

impl fmt::Debug for ProcessorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorOptions")
            .field("base", &self.base)
            .field("compact_arrays", &self.compact_arrays)
            .field("compact_to_relative", &self.compact_to_relative)
            .field("document_loader", &self.document_loader.as_ref().map(|_| "<loader>"))
            .field("expand_context", &self.expand_context)
            .field("ordered", &self.ordered)
            .field("processing_mode", &self.processing_mode)
            .field("rdf_direction", &self.rdf_direction)
            .field("remote_context_limit", &self.remote_context_limit)
            .field("safe_mode", &self.safe_mode)
            .finish()
    }
}
