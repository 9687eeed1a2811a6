//! Term replacements applied to machine translations.

use serde::{
    Deserialize,
    Serialize,
};

/// One forced replacement (brand names, domain words).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlossaryTerm {
    /// Text to look for.
    pub from: String,
    /// Replacement.
    pub to: String,
}

impl GlossaryTerm {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Ordered list of case-sensitive replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glossary {
    /// Replacements in application order.
    terms: Vec<GlossaryTerm>,
}

impl Glossary {
    #[must_use]
    pub const fn new(terms: Vec<GlossaryTerm>) -> Self {
        Self { terms }
    }

    /// Replaces every occurrence of each term, in declaration order.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        self.terms
            .iter()
            .filter(|term| !term.from.is_empty())
            .fold(text.to_string(), |out, term| out.replace(&term.from, &term.to))
    }
}
