use std::fmt;

use thiserror::Error;

/// The closed set of JSON-LD error kinds raised by context resolution and
/// node map generation. `Display` renders the registered JSON-LD error string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // === Shape errors ===
    CollidingKeywords,
    ConflictingIndexes,
    InvalidIdValue,
    InvalidIncludedValue,
    InvalidIndexValue,
    InvalidReversePropertyMap,
    InvalidReverseValue,
    InvalidSetOrListObject,
    InvalidTypeValue,
    ListOfLists,

    // === Context errors ===
    ContextOverflow,
    CyclicIriMapping,
    InvalidBaseDirection,
    InvalidBaseIri,
    InvalidContainerMapping,
    InvalidContextEntry,
    InvalidContextNullification,
    InvalidDefaultLanguage,
    InvalidImportValue,
    InvalidIriMapping,
    InvalidKeywordAlias,
    InvalidLanguageMapping,
    InvalidLocalContext,
    InvalidNestValue,
    InvalidPrefixValue,
    InvalidPropagateValue,
    InvalidProtectedValue,
    InvalidReverseProperty,
    InvalidScopedContext,
    InvalidTermDefinition,
    InvalidTypeMapping,
    InvalidVersionValue,
    InvalidVocabMapping,
    KeywordRedefinition,
    ProcessingModeConflict,
    ProtectedTermRedefinition,
    RecursiveContextInclusion,

    // === Remote loading errors ===
    InvalidRemoteContext,
    LoadingDocumentFailed,
    LoadingRemoteContextFailed,
    MultipleContextLinkHeaders,

    // === Warnings ===
    MalformedLanguageTag,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CollidingKeywords => "colliding keywords",
            ErrorCode::ConflictingIndexes => "conflicting indexes",
            ErrorCode::InvalidIdValue => "invalid @id value",
            ErrorCode::InvalidIncludedValue => "invalid @included value",
            ErrorCode::InvalidIndexValue => "invalid @index value",
            ErrorCode::InvalidReversePropertyMap => "invalid reverse property map",
            ErrorCode::InvalidReverseValue => "invalid @reverse value",
            ErrorCode::InvalidSetOrListObject => "invalid set or list object",
            ErrorCode::InvalidTypeValue => "invalid type value",
            ErrorCode::ListOfLists => "list of lists",
            ErrorCode::ContextOverflow => "context overflow",
            ErrorCode::CyclicIriMapping => "cyclic IRI mapping",
            ErrorCode::InvalidBaseDirection => "invalid base direction",
            ErrorCode::InvalidBaseIri => "invalid base IRI",
            ErrorCode::InvalidContainerMapping => "invalid container mapping",
            ErrorCode::InvalidContextEntry => "invalid context entry",
            ErrorCode::InvalidContextNullification => "invalid context nullification",
            ErrorCode::InvalidDefaultLanguage => "invalid default language",
            ErrorCode::InvalidImportValue => "invalid @import value",
            ErrorCode::InvalidIriMapping => "invalid IRI mapping",
            ErrorCode::InvalidKeywordAlias => "invalid keyword alias",
            ErrorCode::InvalidLanguageMapping => "invalid language mapping",
            ErrorCode::InvalidLocalContext => "invalid local context",
            ErrorCode::InvalidNestValue => "invalid @nest value",
            ErrorCode::InvalidPrefixValue => "invalid @prefix value",
            ErrorCode::InvalidPropagateValue => "invalid @propagate value",
            ErrorCode::InvalidProtectedValue => "invalid @protected value",
            ErrorCode::InvalidReverseProperty => "invalid reverse property",
            ErrorCode::InvalidScopedContext => "invalid scoped context",
            ErrorCode::InvalidTermDefinition => "invalid term definition",
            ErrorCode::InvalidTypeMapping => "invalid type mapping",
            ErrorCode::InvalidVersionValue => "invalid @version value",
            ErrorCode::InvalidVocabMapping => "invalid vocab mapping",
            ErrorCode::KeywordRedefinition => "keyword redefinition",
            ErrorCode::ProcessingModeConflict => "processing mode conflict",
            ErrorCode::ProtectedTermRedefinition => "protected term redefinition",
            ErrorCode::RecursiveContextInclusion => "recursive context inclusion",
            ErrorCode::InvalidRemoteContext => "invalid remote context",
            ErrorCode::LoadingDocumentFailed => "loading document failed",
            ErrorCode::LoadingRemoteContextFailed => "loading remote context failed",
            ErrorCode::MultipleContextLinkHeaders => "multiple context link headers",
            ErrorCode::MalformedLanguageTag => "malformed language tag",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JsonLdError {
    /// A shape or context violation detected by one of the algorithms.
    #[error("{code}: {message}")]
    Processing { code: ErrorCode, message: String },

    /// A document or context could not be retrieved or was unusable.
    #[error("{code} for {url}: {source}")]
    Loading {
        code: ErrorCode,
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error raised while processing a nested scope, re-labelled by the
    /// enclosing algorithm.
    #[error("{code}: {message}")]
    Scoped {
        code: ErrorCode,
        message: String,
        #[source]
        source: Box<JsonLdError>,
    },
}

impl JsonLdError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        JsonLdError::Processing {
            code,
            message: message.into(),
        }
    }

    pub fn loading(
        code: ErrorCode,
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        JsonLdError::Loading {
            code,
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn scoped(code: ErrorCode, message: impl Into<String>, source: JsonLdError) -> Self {
        JsonLdError::Scoped {
            code,
            message: message.into(),
            source: Box::new(source),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            JsonLdError::Processing { code, .. }
            | JsonLdError::Loading { code, .. }
            | JsonLdError::Scoped { code, .. } => *code,
        }
    }
}
