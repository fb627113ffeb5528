use std::collections::HashSet;

use crate::error::{AppError, Result};

/// Matching key for a keyword: every whitespace character removed, then lower-cased.
/// Only used for lookups, never displayed.
pub fn canonical(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Parse free-form keyword input (comma or newline separated) into an ordered,
/// de-duplicated list. Blank entries are dropped, first occurrence wins.
pub fn parse_keyword_input(raw: &str) -> Result<Vec<String>> {
    clean_keywords(raw.split([',', '\n']))
}

pub fn clean_keywords<I, S>(keywords: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_string())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect();

    if cleaned.is_empty() {
        return Err(AppError::Validation("키워드를 입력해주세요. (no keywords after cleaning)".to_string()));
    }
    Ok(cleaned)
}

/// Canonical forms of the primary keywords that get cross-referenced, built
/// once per request.
#[derive(Debug, Default)]
pub struct KeywordLookup {
    canonical_keys: HashSet<String>,
    /// Distinct originals in insertion order; used as seed keywords.
    originals: Vec<String>,
}

impl KeywordLookup {
    pub fn new<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Self {
        let mut lookup = Self::default();
        for kw in keywords {
            let key = canonical(kw);
            if key.is_empty() || !lookup.canonical_keys.insert(key) {
                continue;
            }
            lookup.originals.push(kw.to_string());
        }
        lookup
    }

    /// Canonical key of `text` when it names a looked-up keyword.
    pub fn resolve(&self, text: &str) -> Option<String> {
        let key = canonical(text);
        self.canonical_keys.contains(&key).then_some(key)
    }

    pub fn originals(&self) -> &[String] {
        &self.originals
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}
