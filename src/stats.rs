//! Pulls the aggregate hit count out of a multi-search response body.

use std::sync::OnceLock;

use regex::Regex;

/// Marks a count that could not be extracted. Never a real count.
pub const COUNT_UNAVAILABLE: i64 = -1;

fn total_hits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#","hits":\{"total":(\d+)"#).expect("total hits pattern is valid")
    })
}

/// First integer after `,"hits":{"total":`, or [`COUNT_UNAVAILABLE`].
pub fn extract_total_hits(body: &str) -> i64 {
    total_hits_pattern()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(COUNT_UNAVAILABLE)
}
