//! Key/value field extraction from document text.

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::FieldMap;

/// Auto-discovered keys must be shorter than this many characters.
pub const MAX_DISCOVERED_KEY_CHARS: usize = 50;

/// "key: value" lines.
const GENERIC_PATTERN: &str = r"(?m)^([^:\n]+):[^\S\n]*(.+)$";

/// Caller-supplied field rules: field name to pattern, in declaration order.
///
/// Patterns are compiled once, case-insensitive and multi-line. A pattern
/// with a capturing group yields its first group; otherwise the whole match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<String, String>", into = "IndexMap<String, String>")]
pub struct ExtractionRuleSet {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    key: String,
    pattern: Regex,
}

impl ExtractionRuleSet {
    /// Compile rules from `(field name, pattern)` pairs.
    ///
    /// A later pair with an existing field name replaces the earlier pattern
    /// but keeps its position. Fails with [`Error::InvalidRule`] on the first
    /// pattern that does not compile.
    pub fn new<I, K, P>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let mut compiled: Vec<Rule> = Vec::new();
        for (key, pattern) in rules {
            let key = key.into();
            let pattern = RegexBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|e| Error::InvalidRule {
                    key: key.clone(),
                    message: e.to_string(),
                })?;

            match compiled.iter_mut().find(|r| r.key == key) {
                Some(existing) => existing.pattern = pattern,
                None => compiled.push(Rule { key, pattern }),
            }
        }
        Ok(Self { rules: compiled })
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Field names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.key.as_str())
    }

    /// Pattern source for a field.
    pub fn pattern(&self, key: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.pattern.as_str())
    }
}

impl TryFrom<IndexMap<String, String>> for ExtractionRuleSet {
    type Error = Error;

    fn try_from(map: IndexMap<String, String>) -> Result<Self> {
        Self::new(map)
    }
}

impl From<ExtractionRuleSet> for IndexMap<String, String> {
    fn from(set: ExtractionRuleSet) -> Self {
        set.rules
            .into_iter()
            .map(|r| (r.key, r.pattern.as_str().to_string()))
            .collect()
    }
}

/// Produces a [`FieldMap`] from text, either by rules or by discovering
/// "key: value" lines.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    generic: Regex,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self {
            generic: Regex::new(GENERIC_PATTERN).unwrap(),
        }
    }

    /// Extract fields from `text`.
    ///
    /// With a non-empty rule set, only rule keys that match appear, in rule
    /// order. Without rules (or with an empty set), every "key: value" line
    /// whose key is shorter than [`MAX_DISCOVERED_KEY_CHARS`] and whose value
    /// is non-empty is collected; a repeated key takes the last value and
    /// keeps the position of its first occurrence.
    pub fn extract(&self, text: &str, rules: Option<&ExtractionRuleSet>) -> FieldMap {
        match rules {
            Some(rules) if !rules.is_empty() => Self::apply_rules(text, rules),
            _ => self.discover(text),
        }
    }

    fn apply_rules(text: &str, rules: &ExtractionRuleSet) -> FieldMap {
        let mut fields = FieldMap::new();
        for rule in &rules.rules {
            let Some(caps) = rule.pattern.captures(text) else {
                log::debug!("rule '{}' did not match", rule.key);
                continue;
            };
            let group = if rule.pattern.captures_len() > 1 { 1 } else { 0 };
            let value = caps.get(group).map_or("", |m| m.as_str()).trim();
            if value.is_empty() {
                log::debug!("rule '{}' matched without a value", rule.key);
                continue;
            }
            fields.insert(rule.key.clone(), value.to_string());
        }
        fields
    }

    fn discover(&self, text: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        for caps in self.generic.captures_iter(text) {
            let key = caps.get(1).map_or("", |m| m.as_str()).trim();
            let value = caps.get(2).map_or("", |m| m.as_str()).trim();
            if key.chars().count() < MAX_DISCOVERED_KEY_CHARS && !value.is_empty() {
                fields.insert(key.to_string(), value.to_string());
            }
        }
        fields
    }
}
