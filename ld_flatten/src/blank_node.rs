use std::collections::HashMap;

/// Issues `_:b0`, `_:b1`, ... and remembers which input identifier each
/// generated label stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankNodeGenerator {
    prefix: String,
    counter: u64,
    issued: HashMap<String, String>,
    originals: HashMap<String, String>,
}

impl Default for BlankNodeGenerator {
    fn default() -> Self {
        BlankNodeGenerator::new()
    }
}

impl BlankNodeGenerator {
    pub fn new() -> Self {
        BlankNodeGenerator::with_prefix("_:b")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        BlankNodeGenerator {
            prefix: prefix.into(),
            counter: 0,
            issued: HashMap::new(),
            originals: HashMap::new(),
        }
    }

    /// Returns the label for `identifier`, issuing one on first sight.
    /// `None` always issues a fresh label.
    pub fn generate(&mut self, identifier: Option<&str>) -> String {
        if let Some(identifier) = identifier
            && let Some(existing) = self.issued.get(identifier)
        {
            return existing.clone();
        }

        let label = format!("{}{}", self.prefix, self.counter);
        self.counter += 1;
        if let Some(identifier) = identifier {
            self.issued.insert(identifier.to_string(), label.clone());
            self.originals.insert(label.clone(), identifier.to_string());
        }
        label
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.issued.get(identifier).map(String::as_str)
    }

    /// Input identifier a generated label was issued for.
    pub fn original(&self, label: &str) -> Option<&str> {
        self.originals.get(label).map(String::as_str)
    }

    /// Number of labels issued so far, including anonymous ones.
    pub fn counter(&self) -> u64 {
        self.counter
    }
}
