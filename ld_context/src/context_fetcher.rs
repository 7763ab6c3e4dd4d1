use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::document_loader::{CONTEXT_PROFILE, DocumentLoader, HttpDocumentLoader};
use crate::error::{ErrorCode, JsonLdError};
use crate::models::{LoaderOptions, RemoteContext};
use crate::options::ProcessorOptions;

/// Fetches context documents and keeps them for the lifetime of the
/// provider. One provider serves one top-level processing call.
pub struct RemoteContextProvider {
    loader: Arc<dyn DocumentLoader>,
    cache: HashMap<String, Arc<RemoteContext>>,
}

impl Default for RemoteContextProvider {
    fn default() -> Self {
        RemoteContextProvider::new(Arc::new(HttpDocumentLoader::new()))
    }
}

impl RemoteContextProvider {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        RemoteContextProvider {
            loader,
            cache: HashMap::new(),
        }
    }

    pub fn from_options(options: &ProcessorOptions) -> Self {
        match &options.document_loader {
            Some(loader) => RemoteContextProvider::new(Arc::clone(loader)),
            None => RemoteContextProvider::default(),
        }
    }

    pub fn get_remote_context(&mut self, url: &str) -> Result<Arc<RemoteContext>, JsonLdError> {
        if let Some(cached) = self.cache.get(url) {
            debug!(url, "remote context cache hit");
            return Ok(Arc::clone(cached));
        }

        let options = LoaderOptions {
            profile: Some(CONTEXT_PROFILE.to_string()),
            request_profile: vec![CONTEXT_PROFILE.to_string()],
        };
        let document = self.loader.load(url, &options).map_err(|e| match e.code() {
            ErrorCode::LoadingRemoteContextFailed => e,
            _ => JsonLdError::loading(ErrorCode::LoadingRemoteContextFailed, url, e),
        })?;

        let context = match document.document {
            serde_json::Value::Object(mut map) => map.remove("@context").ok_or_else(|| {
                JsonLdError::new(
                    ErrorCode::InvalidRemoteContext,
                    format!("document at '{}' has no @context entry", url),
                )
            })?,
            _ => {
                return Err(JsonLdError::new(
                    ErrorCode::InvalidRemoteContext,
                    format!("document at '{}' is not a JSON object", url),
                ));
            }
        };

        debug!(url, document_url = %document.document_url, "loaded remote context");
        let remote = Arc::new(RemoteContext {
            document_url: document.document_url,
            context,
        });
        self.cache.insert(url.to_string(), Arc::clone(&remote));
        Ok(remote)
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.cache.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
