use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::active_context::ActiveContext;
use crate::context_fetcher::RemoteContextProvider;
use crate::context_processor::ContextProcessor;
use crate::error::JsonLdError;
use crate::models::{ContextSource, ProcessorWarning};
use crate::options::ProcessorOptions;

/// An active context together with the warnings raised while building it.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub context: Arc<ActiveContext>,
    pub warnings: Vec<ProcessorWarning>,
}

/// Entry point for resolving a list of context sources into one active
/// context.
///
/// ```ignore
/// let resolved = ContextBuilder::new(ProcessorOptions::default())
///     .add_context(ContextSource::Url("https://www.w3.org/ns/activitystreams".into()))
///     .add_context(ContextSource::Inline(json!({"toot": "http://joinmastodon.org/ns#"})))
///     .build()?;
/// let name = resolved.context.expand_iri("name", true, false);
/// ```
pub struct ContextBuilder {
    options: ProcessorOptions,
    contexts: Vec<ContextSource>,
}

impl ContextBuilder {
    pub fn new(options: ProcessorOptions) -> Self {
        ContextBuilder {
            options,
            contexts: Vec::new(),
        }
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Sources are applied in the order they were added.
    pub fn add_context(&mut self, source: ContextSource) -> &mut Self {
        self.contexts.push(source);
        self
    }

    /// Builds with a provider whose cache lives only for this call.
    pub fn build(&self) -> Result<ResolvedContext, JsonLdError> {
        let mut provider = RemoteContextProvider::from_options(&self.options);
        self.build_with(&mut provider)
    }

    pub fn build_with(&self, provider: &mut RemoteContextProvider) -> Result<ResolvedContext, JsonLdError> {
        let base = self.options.base.as_deref();
        let mut processor = ContextProcessor::new(&self.options, provider);
        let mut context = Arc::new(ActiveContext::new(self.options.base.clone()));

        if let Some(expand_context) = &self.options.expand_context {
            let local = match expand_context {
                Value::Object(map) => map.get("@context").unwrap_or(expand_context),
                other => other,
            };
            debug!("applying expand context");
            context = Arc::new(processor.process_context(&context, local, base)?);
        }

        for source in &self.contexts {
            let local = match source {
                ContextSource::Url(url) => Value::String(url.clone()),
                ContextSource::Inline(value) => value.clone(),
            };
            context = Arc::new(processor.process_context(&context, &local, base)?);
        }

        debug!(
            terms = context.term_count(),
            remote = processor.remote_fetch_count(),
            "context resolved"
        );
        Ok(ResolvedContext {
            context,
            warnings: processor.into_warnings(),
        })
    }
}
