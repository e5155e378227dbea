// Queue Pattern Expander
//
// Resolves specifiers against the real queue names into queue -> weight.
// Pure computation: the only input besides its arguments is a SpecifierSource.

use crate::application::registry::SpecifierSource;
use crate::domain::error::{DomainError, Result};
use crate::domain::specifier::wildcard_regex;
use crate::domain::{ExpansionResult, QueueName, QueueSpecifier, SpecifierKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Maximum nesting of `@key` references before expansion gives up
pub const MAX_REFERENCE_DEPTH: usize = 16;

/// A distinct specifier with its resolved matches
struct Expansion {
    spec: QueueSpecifier,
    occurrences: u64,
    matches: Vec<QueueName>,
}

/// Expands specifier lists for one host
pub struct QueueExpander<'a> {
    source: &'a dyn SpecifierSource,
    host: &'a str,
    max_depth: usize,
}

impl<'a> QueueExpander<'a> {
    /// # Arguments
    /// * `source` - registry lookup for `@key` references
    /// * `host` - key used by `@` references without an explicit key
    pub fn new(source: &'a dyn SpecifierSource, host: &'a str) -> Self {
        Self {
            source,
            host,
            max_depth: MAX_REFERENCE_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand `specifiers` against `real_queues` (ascending order expected)
    ///
    /// Each distinct specifier contributes `suffix * occurrences * L / m` to
    /// every queue it matches, where `m` is its match count and `L` the least
    /// common multiple of all match counts. A specifier's total weight mass
    /// is therefore independent of how many queues it expands to.
    ///
    /// A negation removes its matches from itself and from every specifier
    /// listed before it; specifiers listed after it are unaffected.
    ///
    /// Weights inside an `@key` reference do not carry over: the reference
    /// contributes the set of queues it expands to, each counted once.
    pub fn expand<S: AsRef<str>>(
        &self,
        specifiers: &[S],
        real_queues: &[QueueName],
    ) -> Result<ExpansionResult> {
        let tokens: Vec<&str> = specifiers.iter().map(AsRef::as_ref).collect();
        let mut chain = Vec::new();
        self.expand_with_chain(&tokens, real_queues, &mut chain)
    }

    fn expand_with_chain(
        &self,
        tokens: &[&str],
        real_queues: &[QueueName],
        chain: &mut Vec<String>,
    ) -> Result<ExpansionResult> {
        // Step 1: resolve each distinct token once, counting duplicates
        let mut expansions: Vec<Expansion> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for &token in tokens {
            if let Some(&pos) = index.get(token) {
                expansions[pos].occurrences += 1;
                continue;
            }
            let spec = QueueSpecifier::parse(token)?;
            let matches = dedup(self.resolve(&spec, real_queues, chain)?);
            index.insert(token, expansions.len());
            expansions.push(Expansion {
                spec,
                occurrences: 1,
                matches,
            });
        }

        // Step 2: negations remove their names from themselves and everything earlier
        let mut negated: HashSet<QueueName> = HashSet::new();
        for idx in (0..expansions.len()).rev() {
            let expansion = &mut expansions[idx];
            if expansion.spec.is_negated() {
                negated.extend(expansion.matches.iter().cloned());
            }
            expansion.matches.retain(|name| !negated.contains(name));
        }

        // Step 3
        expansions.retain(|e| !e.matches.is_empty());

        // Step 4: m >= 1 for every survivor, so L / m is exact
        let lcm = expansions
            .iter()
            .try_fold(1u64, |acc, e| checked_lcm(acc, e.matches.len() as u64))?;

        // Step 5
        let mut result = ExpansionResult::new();
        for expansion in &expansions {
            let per_queue = (lcm / expansion.matches.len() as u64)
                .checked_mul(expansion.spec.weight())
                .and_then(|w| w.checked_mul(expansion.occurrences))
                .ok_or_else(|| DomainError::WeightOverflow(expansion.spec.raw().to_string()))?;
            for name in &expansion.matches {
                result.add(name.clone(), per_queue)?;
            }
        }
        result.retain_positive();

        debug!(
            specifiers = ?tokens,
            lcm = lcm,
            queues = result.len(),
            "Expanded queue specifiers"
        );
        Ok(result)
    }

    /// Matches of a single specifier, negation prefix ignored
    fn resolve(
        &self,
        spec: &QueueSpecifier,
        real_queues: &[QueueName],
        chain: &mut Vec<String>,
    ) -> Result<Vec<QueueName>> {
        match spec.kind() {
            SpecifierKind::Literal(name) => Ok(vec![name.clone()]),
            SpecifierKind::Wildcard(pattern) => {
                let re = wildcard_regex(pattern)?;
                Ok(real_queues
                    .iter()
                    .filter(|name| re.is_match(name))
                    .cloned()
                    .collect())
            }
            SpecifierKind::Reference(key) => {
                let key = key.clone().unwrap_or_else(|| self.host.to_string());
                self.resolve_reference(key, real_queues, chain)
            }
        }
    }

    fn resolve_reference(
        &self,
        key: String,
        real_queues: &[QueueName],
        chain: &mut Vec<String>,
    ) -> Result<Vec<QueueName>> {
        if chain.contains(&key) {
            let mut cycle = chain.clone();
            cycle.push(key);
            return Err(DomainError::ReferenceCycle { chain: cycle });
        }
        if chain.len() >= self.max_depth {
            return Err(DomainError::ReferenceDepthExceeded {
                key,
                max_depth: self.max_depth,
            });
        }

        let specifiers = self.source.specifiers_for(&key);
        debug!(key = %key, specifiers = ?specifiers, "Resolving dynamic queue reference");

        chain.push(key);
        let tokens: Vec<&str> = specifiers.iter().map(String::as_str).collect();
        let nested = self.expand_with_chain(&tokens, real_queues, chain);
        chain.pop();

        Ok(nested?.names().map(str::to_string).collect())
    }
}

/// Keep the first occurrence of each name
fn dedup(names: Vec<QueueName>) -> Vec<QueueName> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn checked_lcm(a: u64, b: u64) -> Result<u64> {
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or_else(|| DomainError::WeightOverflow(format!("lcm({}, {})", a, b)))
}
