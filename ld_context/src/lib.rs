//! JSON-LD 1.1 context processing.
//!
//! Resolves local and remote `@context` values into an [`ActiveContext`],
//! expands IRIs against it and selects compact terms through its
//! [`InverseContext`].
//!
//! # Basic Usage
//!
//! ```ignore
//! use ld_context::{ContextBuilder, ContextSource, ProcessorOptions};
//! use serde_json::json;
//!
//! let mut builder = ContextBuilder::new(ProcessorOptions::default());
//! builder
//!     .add_context(ContextSource::Url("https://www.w3.org/ns/activitystreams".into()))
//!     .add_context(ContextSource::Inline(json!({
//!         "toot": "http://joinmastodon.org/ns#",
//!         "discoverable": "toot:discoverable"
//!     })));
//! let resolved = builder.build()?;
//!
//! // "http://joinmastodon.org/ns#discoverable"
//! let iri = resolved.context.expand_iri("discoverable", true, false);
//!
//! // "discoverable"
//! let term = resolved.context.select_term(
//!     "http://joinmastodon.org/ns#discoverable",
//!     &["@none"],
//!     "@language",
//!     &["@none"],
//! );
//! ```
//!
//! # Remote Contexts
//!
//! String entries of a context are loaded through a [`DocumentLoader`]. The
//! default [`HttpDocumentLoader`] is a blocking `ureq` client; tests and
//! offline callers inject their own loader through
//! [`ProcessorOptions::with_document_loader`].
//!
//! Every [`ContextBuilder::build`] call gets a fresh [`RemoteContextProvider`],
//! so cached documents never leak between independent calls. Use
//! [`ContextBuilder::build_with`] to share one provider on purpose.
//!
//! The number of distinct remote documents a single call may fetch is capped
//! by [`ProcessorOptions::remote_context_limit`]:
//!
//! | Limit | Behaviour |
//! |-------|-----------|
//! | `0` | Remote references fail with `context overflow`; the loader is never called |
//! | `n > 0` | At most `n` distinct URLs per call |
//! | `< 0` | Unbounded |
//!
//! # Errors
//!
//! All failures are [`JsonLdError`] values carrying an [`ErrorCode`] whose
//! `Display` is the JSON-LD error string. A failed scope never alters the
//! context it was applied to.
//!
//! # Safe Mode
//!
//! Recoverable problems (keyword-like terms, malformed language tags) are
//! always logged through `tracing`. With [`ProcessorOptions::with_safe_mode`]
//! they are also returned in [`ResolvedContext::warnings`].

mod active_context;
mod context_builder;
mod context_fetcher;
mod context_processor;
mod document_loader;
mod error;
mod inverse_context;
pub mod iri;
mod models;
mod options;
pub mod syntax;

pub use active_context::ActiveContext;
pub use context_builder::{ContextBuilder, ResolvedContext};
pub use context_fetcher::RemoteContextProvider;
pub use context_processor::{ContextFlags, ContextProcessor};
pub use document_loader::{
    CONTEXT_LINK_REL, CONTEXT_PROFILE, DocumentLoader, HttpDocumentLoader,
};
pub use error::{ErrorCode, JsonLdError};
pub use inverse_context::{ContainerMap, InverseContext, TypeLanguageMap};
pub use models::*;
pub use options::{ProcessingMode, ProcessorOptions, RdfDirection};

pub use serde_json;
