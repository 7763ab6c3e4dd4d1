use std::sync::LazyLock;

use regex::Regex;

use crate::models::Direction;

pub const KEYWORDS: &[&str] = &[
    "@base",
    "@container",
    "@context",
    "@default",
    "@direction",
    "@embed",
    "@explicit",
    "@graph",
    "@id",
    "@import",
    "@included",
    "@index",
    "@json",
    "@language",
    "@list",
    "@nest",
    "@none",
    "@omitDefault",
    "@prefix",
    "@preserve",
    "@propagate",
    "@protected",
    "@requireAll",
    "@reverse",
    "@set",
    "@type",
    "@value",
    "@version",
    "@vocab",
];

/// Entries of a local context that are not term definitions.
pub const CONTEXT_KEYWORDS: &[&str] = &[
    "@base",
    "@direction",
    "@import",
    "@language",
    "@propagate",
    "@protected",
    "@version",
    "@vocab",
];

/// Keys allowed inside an expanded term definition.
pub const TERM_DEFINITION_KEYS: &[&str] = &[
    "@id",
    "@reverse",
    "@container",
    "@context",
    "@direction",
    "@index",
    "@language",
    "@nest",
    "@prefix",
    "@protected",
    "@type",
];

static KEYWORD_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@[a-zA-Z]+$").unwrap_or_else(|e| panic!("invalid keyword pattern: {e}"))
});

static LANGUAGE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$")
        .unwrap_or_else(|e| panic!("invalid language tag pattern: {e}"))
});

pub fn is_keyword(value: &str) -> bool {
    KEYWORDS.contains(&value)
}

/// True for strings shaped like a keyword (`@` followed by letters) whether
/// or not the keyword exists. Such terms are reserved.
pub fn matches_keyword_production(value: &str) -> bool {
    KEYWORD_FORM.is_match(value)
}

pub fn is_well_formed_language_tag(value: &str) -> bool {
    LANGUAGE_TAG.is_match(value)
}

pub fn parse_direction(value: &str) -> Option<Direction> {
    match value {
        "ltr" => Some(Direction::Ltr),
        "rtl" => Some(Direction::Rtl),
        _ => None,
    }
}
