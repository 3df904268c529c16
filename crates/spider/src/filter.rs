//! Keyword filtering for parsed records.

use regex::Regex;

use domain::{Record, Subscription};

/// Compile filter strings into regex patterns (case-insensitive).
fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    tracing::warn!("Invalid filter regex '{}': {}", pattern, e);
                    e
                })
                .ok()
        })
        .collect()
}

fn matches_any(haystack: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|re| re.is_match(haystack))
}

/// Apply a subscription's white/black keyword rules to records.
///
/// When white patterns are present, a record must match at least one to
/// be kept. A record matching any black pattern is dropped regardless,
/// so a record matching both an allow and a deny pattern is dropped.
/// Patterns are matched against title and content.
pub fn apply_keyword_filters(records: Vec<Record>, subscription: &Subscription) -> Vec<Record> {
    let white = compile_patterns(&subscription.white_keywords);
    let black = compile_patterns(&subscription.black_keywords);
    if white.is_empty() && black.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| {
            let haystack = format!(
                "{}\n{}",
                record.title.as_deref().unwrap_or(""),
                record.content.as_deref().unwrap_or("")
            );
            let allowed = white.is_empty() || matches_any(&haystack, &white);
            allowed && !matches_any(&haystack, &black)
        })
        .collect()
}
