//! Localized text.

use std::collections::BTreeMap;

/// Language used when a requested translation is missing.
pub const EN_US: &str = "en_US";

/// Alternative renderings of the same text, keyed by language tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alt(BTreeMap<String, String>);

impl Alt {
    /// Text with only the [`EN_US`] rendering.
    pub fn new(en_us: impl Into<String>) -> Self {
        Self::default().with(EN_US, en_us)
    }

    /// Adds or replaces the rendering for `lang`.
    pub fn with(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.0.insert(lang.into(), text.into());
        self
    }

    /// Rendering for `lang`, falling back to [`EN_US`], then to "".
    pub fn get(&self, lang: &str) -> &str {
        self.0
            .get(lang)
            .or_else(|| self.0.get(EN_US))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|s| s.is_empty())
    }
}

impl From<&str> for Alt {
    fn from(en_us: &str) -> Self {
        Alt::new(en_us)
    }
}

/// Reduces a locale such as `de_DE.UTF-8@euro` to its language tag `de_DE`.
pub(crate) fn tag_of(locale: &str) -> Option<&str> {
    let tag = locale.split(['.', '@']).next().unwrap_or("");
    match tag {
        "" | "C" | "POSIX" => None,
        tag => Some(tag),
    }
}
