use url::Url;

pub fn is_blank_node_identifier(value: &str) -> bool {
    value.starts_with("_:")
}

/// An absolute IRI has a scheme. Blank node identifiers do not count.
pub fn is_absolute_iri(value: &str) -> bool {
    if is_blank_node_identifier(value) {
        return false;
    }
    Url::parse(value).is_ok()
}

/// A relative IRI reference: not absolute, not a blank node identifier and
/// free of characters that would need escaping.
pub fn is_relative_iri(value: &str) -> bool {
    !is_absolute_iri(value)
        && !is_blank_node_identifier(value)
        && !value.starts_with('@')
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>\"{}|\\^`".contains(c))
}

pub fn is_iri(value: &str) -> bool {
    is_absolute_iri(value) || is_relative_iri(value)
}

/// IRIs ending in a gen-delim may act as simple-term prefixes.
pub fn ends_with_gen_delim(value: &str) -> bool {
    matches!(value.chars().last(), Some(':' | '/' | '?' | '#' | '[' | ']' | '@'))
}

/// Resolves `value` against `base`. Without a usable base the value is
/// returned only if it is already absolute.
pub fn resolve_iri(base: Option<&str>, value: &str) -> Option<String> {
    if is_absolute_iri(value) {
        return Some(value.to_string());
    }
    let base = Url::parse(base?).ok()?;
    base.join(value).ok().map(|url| url.to_string())
}

/// True when `value` has a colon anywhere after its first character.
pub fn has_inner_colon(value: &str) -> bool {
    value.char_indices().skip(1).any(|(_, c)| c == ':')
}

/// Splits `prefix:suffix` at the first colon. Blank node identifiers and
/// `//` authority suffixes are not compact IRIs.
pub fn split_compact_iri(value: &str) -> Option<(&str, &str)> {
    let (prefix, suffix) = value.split_once(':')?;
    if prefix == "_" || suffix.starts_with("//") {
        return None;
    }
    Some((prefix, suffix))
}
