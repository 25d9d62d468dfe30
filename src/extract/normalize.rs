//! Text normalization applied to every resolved page.

use regex::Regex;

/// Canonicalizes raw extracted text.
///
/// Per line: trailing whitespace is stripped, runs of three or more
/// horizontal whitespace characters collapse to a single space, and the
/// line is trimmed. Consecutive blank lines collapse to one, and blank
/// lines at either end are dropped. The transformation is idempotent.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    horizontal_run: Regex,
}

impl TextNormalizer {
    /// Create a new normalizer.
    pub fn new() -> Self {
        Self {
            // Any whitespace except line breaks, three or more in a row.
            horizontal_run: Regex::new(r"[^\S\r\n]{3,}").unwrap(),
        }
    }

    /// Normalize `raw` text.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

        let mut lines: Vec<String> = Vec::new();
        let mut previous_blank = true; // suppresses leading blank lines
        for line in unified.split('\n') {
            let collapsed = self.horizontal_run.replace_all(line.trim_end(), " ");
            let cleaned = collapsed.trim();

            if cleaned.is_empty() {
                if !previous_blank {
                    lines.push(String::new());
                }
                previous_blank = true;
            } else {
                lines.push(cleaned.to_string());
                previous_blank = false;
            }
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize text with a one-off [`TextNormalizer`].
///
/// Callers normalizing many strings should keep a normalizer around instead.
pub fn normalize(raw: &str) -> String {
    TextNormalizer::new().normalize(raw)
}
