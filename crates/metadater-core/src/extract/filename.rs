use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::ConfigError;

/// Joins captured fields before they are handed to chrono. Never produced by
/// any directive's sub-pattern.
const FIELD_SEP: &str = "|";

/// One strptime-style template, e.g. `IMG_%Y%m%d_%H%M%S`.
///
/// The template is compiled into a case-insensitive regex with one capture
/// group per directive. Literal text only has to match; the captured fields
/// are re-joined and parsed by chrono.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    format: String,
    regex: Regex,
    fields_format: String,
}

impl FilenamePattern {
    pub fn new(format: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: format.to_string(),
            reason: reason.to_string(),
        };

        if format.trim().is_empty() {
            return Err(invalid("empty pattern"));
        }

        let mut re = String::from("(?i)");
        let mut literal = String::new();
        let mut fields: Vec<String> = Vec::new();
        let mut has_year = false;

        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let Some(directive) = chars.next() else {
                return Err(invalid("dangling `%` at end of pattern"));
            };
            if directive == '%' {
                literal.push('%');
                continue;
            }

            let piece = match directive {
                'Y' => r"\d{4}",
                'y' => r"\d{2}",
                'm' | 'd' | 'H' | 'I' | 'M' | 'S' => r"\d{2}",
                'j' => r"\d{3}",
                'b' | 'h' | 'a' => r"[a-z]{3}",
                'B' | 'A' => r"[a-z]+",
                'p' => r"[ap]m",
                other => return Err(invalid(&format!("unsupported directive `%{other}`"))),
            };
            has_year |= matches!(directive, 'Y' | 'y');

            re.push_str(&regex::escape(&literal));
            literal.clear();
            re.push('(');
            re.push_str(piece);
            re.push(')');
            fields.push(format!("%{directive}"));
        }
        re.push_str(&regex::escape(&literal));

        if !has_year {
            return Err(invalid("pattern needs a year (`%Y` or `%y`)"));
        }

        let regex = Regex::new(&re).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            format: format.to_string(),
            regex,
            fields_format: fields.join(FIELD_SEP),
        })
    }

    /// Find the first place in `name` where this pattern yields a valid
    /// date. Text before and after the match is ignored.
    pub fn find_in(&self, name: &str) -> Option<NaiveDateTime> {
        let mut start = 0;
        while start <= name.len() {
            let caps = self.regex.captures_at(name, start)?;
            let whole = caps.get(0)?;

            let text = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(FIELD_SEP);
            if let Some(dt) = self.parse_fields(&text) {
                return Some(dt);
            }

            // Not a real date here (month 13 etc.); retry one character later.
            let step = name[whole.start()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            start = whole.start() + step;
        }
        None
    }

    fn parse_fields(&self, text: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, &self.fields_format) {
            return Some(dt);
        }
        NaiveDate::parse_from_str(text, &self.fields_format)
            .ok()?
            .and_hms_opt(0, 0, 0)
    }
}

/// Ordered list of file name patterns. The first pattern that matches wins.
#[derive(Debug, Clone, Default)]
pub struct DateParser {
    patterns: Vec<FilenamePattern>,
}

impl DateParser {
    /// Compile every non-blank entry of `formats`.
    pub fn new<S: AsRef<str>>(formats: &[S]) -> Result<Self, ConfigError> {
        let patterns = formats
            .iter()
            .map(|f| f.as_ref().trim())
            .filter(|f| !f.is_empty())
            .map(FilenamePattern::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn parse(&self, filename: &str) -> Option<NaiveDateTime> {
        parse_filename_date(filename, &self.patterns)
    }
}

/// Try each pattern in order against `filename`.
pub fn parse_filename_date(filename: &str, patterns: &[FilenamePattern]) -> Option<NaiveDateTime> {
    let basename = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    patterns.iter().find_map(|p| {
        let dt = p.find_in(basename)?;
        log::trace!("{basename}: matched `{}`", p.format);
        Some(dt)
    })
}
