// Queue Specifier Model
//
// A specifier is a configured token describing the queues a worker wants:
//   "critical"      literal queue name
//   "critical.3"    literal with weight 3
//   "*high*"        wildcard over the known queues
//   "!low*"         negation (removes matches from earlier specifiers)
//   "@" / "@web"    registry reference (empty key = this host)

use regex::Regex;

use super::error::{DomainError, Result};

pub const NEGATION_PREFIX: char = '!';
pub const REFERENCE_PREFIX: char = '@';
pub const WILDCARD: char = '*';

/// Weight of a specifier without a `.N` suffix
pub const DEFAULT_WEIGHT: u64 = 1;

/// Placeholders used when specifier characters collide with shell/CLI syntax
const CLI_TRANSLATIONS: [(&str, &str); 3] = [(".star.", "*"), (".at.", "@"), (".not.", "!")];

/// What a specifier resolves against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifierKind {
    /// Trusted concrete queue name (weight suffix removed)
    Literal(String),
    /// `*` pattern (weight suffix removed) matched against the known queues
    Wildcard(String),
    /// Registry key; `None` means the current host identifier
    Reference(Option<String>),
}

/// Parsed form of a single specifier token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpecifier {
    raw: String,
    negated: bool,
    kind: SpecifierKind,
    weight: u64,
}

impl QueueSpecifier {
    /// Parse a raw token
    ///
    /// The weight suffix is read from the end of the raw token regardless of
    /// kind. It only fails when the suffix digits do not fit in a `u64`.
    pub fn parse(raw: &str) -> Result<Self> {
        let weight = match split_weight_suffix(raw).1 {
            Some(digits) => digits
                .parse::<u64>()
                .map_err(|e| DomainError::InvalidWeight(format!("{} ({})", raw, e)))?,
            None => DEFAULT_WEIGHT,
        };

        let (negated, body) = match raw.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let kind = if let Some(key) = body.strip_prefix(REFERENCE_PREFIX) {
            let key = key.trim();
            SpecifierKind::Reference((!key.is_empty()).then(|| key.to_string()))
        } else if body.contains(WILDCARD) {
            SpecifierKind::Wildcard(split_weight_suffix(body).0.to_string())
        } else {
            SpecifierKind::Literal(split_weight_suffix(body).0.to_string())
        };

        Ok(Self {
            raw: raw.to_string(),
            negated,
            kind,
            weight,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn kind(&self) -> &SpecifierKind {
        &self.kind
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }
}

/// Build an anchored matcher for a wildcard pattern
///
/// Every `*` matches any run of characters; everything else matches literally.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).map_err(|e| DomainError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// True if any token uses negation, reference or wildcard syntax
pub fn has_dynamic_syntax<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().map(AsRef::as_ref).any(|t| {
        t.starts_with(NEGATION_PREFIX) || t.starts_with(REFERENCE_PREFIX) || t.contains(WILDCARD)
    })
}

/// Map CLI-escaped placeholders back to specifier syntax
pub fn translate_from_cli(token: &str) -> String {
    CLI_TRANSLATIONS
        .iter()
        .fold(token.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Split a trailing `.<digits>` weight suffix off a token
fn split_weight_suffix(token: &str) -> (&str, Option<&str>) {
    match token.rfind('.') {
        Some(idx) => {
            let digits = &token[idx + 1..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                (&token[..idx], Some(digits))
            } else {
                (token, None)
            }
        }
        None => (token, None),
    }
}
