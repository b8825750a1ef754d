//! Declarative vocabulary matching
//!
//! Detectors describe what they look for as `(regex, metadata)` tables and
//! share one scanner instead of each walking the text by hand.

use regex::Regex;

/// A compiled pattern with the metadata a detector attaches to its hits.
pub struct Rule<M> {
    pub regex: Regex,
    pub meta: M,
}

/// Compile a static vocabulary entry.
///
/// Literal tables are part of the binary, so a bad pattern is a programming
/// error rather than a runtime condition.
pub fn rule<M>(regex_str: &str, meta: M) -> Rule<M> {
    Rule {
        regex: Regex::new(regex_str).expect("Invalid vocabulary regex pattern"),
        meta,
    }
}

/// One match of a rule in the scanned text.
#[derive(Debug)]
pub struct Hit<'r, 't, M> {
    pub meta: &'r M,
    pub start: usize,
    pub end: usize,
    pub text: &'t str,
}

/// Every match of every rule, ordered by position then table order.
///
/// Matches of different rules may overlap; callers that need one hit per
/// span pick among them.
pub fn scan<'r, 't, M>(rules: &'r [Rule<M>], text: &'t str) -> Vec<Hit<'r, 't, M>> {
    let mut hits: Vec<(usize, Hit<'r, 't, M>)> = Vec::new();
    for (order, r) in rules.iter().enumerate() {
        for m in r.regex.find_iter(text) {
            hits.push((
                order,
                Hit {
                    meta: &r.meta,
                    start: m.start(),
                    end: m.end(),
                    text: m.as_str(),
                },
            ));
        }
    }
    hits.sort_by_key(|(order, h)| (h.start, *order));
    hits.into_iter().map(|(_, h)| h).collect()
}

/// First rule, in table order, that matches anywhere in `text`.
pub fn first_rule<'r, M>(rules: &'r [Rule<M>], text: &str) -> Option<&'r Rule<M>> {
    rules.iter().find(|r| r.regex.is_match(text))
}

/// Whether any rule matches.
pub fn any_match<M>(rules: &[Rule<M>], text: &str) -> bool {
    rules.iter().any(|r| r.regex.is_match(text))
}
