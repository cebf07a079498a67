//! Time-Sensitivity Classification
//!
//! Decides whether an answer depends on an implicit time window and whether
//! the user must be asked for one. Rules are ordered, first match wins:
//!
//! 1. metadata counts ("how many branches") are static, always
//! 2. an explicit timeframe makes the query dynamic with nothing to ask
//! 3. time keywords without static keywords: dynamic, ask for a window
//! 4. static keywords without time keywords: static
//! 5. anything else is hybrid

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::fuzzy::normalize;
use super::keywords::KeywordSet;

static METADATA_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:how many|berapa(?: banyak)?) (?:different |unique |distinct )?(?:products?|states?|branch(?:es)?|employees?|staff|departments?|stores?|outlets?|categor(?:y|ies)|skus?)\b",
    )
    .expect("metadata count regex is valid")
});

static TIMEFRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \b\d{4}-\d{1,2}\b
        | \b\d{4}/\d{1,2}\b
        | \bh[12]\b
        | \bq[1-4]\b
        | \b(?:last|this|previous|current|past)\ (?:month|quarter|year|week)\b
        | \b(?:ytd|mtd|year\ to\ date|month\ to\ date)\b
        | \b(?:january|januari|february|februari|march|mac|april|may|mei|june|july|julai|august|ogos|september|october|oktober|november|december|disember)\b
        | \b(?:jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|okt|nov|dec|dis)\b
        | \b(?:19|20)\d{2}\b
        ",
    )
    .expect("timeframe regex is valid")
});

const TIME_KEYWORDS: &[&str] = &[
    "revenue",
    "sales",
    "total",
    "top",
    "trend",
    "trends",
    "compare",
    "comparison",
    "growth",
    "performance",
    "highest",
    "lowest",
    "best",
    "worst",
    "increase",
    "decrease",
    "decline",
    "average",
    "monthly",
    "weekly",
    "daily",
    "attrition",
    "turnover",
];

const STATIC_KEYWORDS: &[&str] = &[
    "how many",
    "list",
    "which",
    "what is",
    "what are",
    "show all",
    "names of",
    "define",
    "definition",
];

/// Words after "may" that mark it as a verb, not a month.
const MAY_AS_VERB: &[&str] = &[
    "i", "we", "you", "they", "he", "she", "it", "know", "have", "has", "be", "been", "not",
    "also", "still", "only", "need", "want", "ask", "see", "get", "use", "help", "vary",
    "differ", "change", "affect", "apply", "include", "require", "take", "cause", "show",
];

/// Words before "may" that mark it as a month ("in may", "since may").
const MAY_AS_MONTH_AFTER: &[&str] = &[
    "in", "for", "of", "since", "until", "till", "during", "from", "to", "by", "through", "before",
    "after", "last", "this", "next", "early", "mid", "late", "end", "bulan",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeClass {
    Static,
    Dynamic,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeClassification {
    pub is_time_sensitive: bool,
    pub needs_clarification: bool,
    pub explicit_timeframe: Option<String>,
    pub classification: TimeClass,
}

impl TimeClassification {
    fn fixed(classification: TimeClass) -> Self {
        Self {
            is_time_sensitive: false,
            needs_clarification: false,
            explicit_timeframe: None,
            classification,
        }
    }
}

/// First explicit timeframe mentioned in `text`, lowercased.
pub fn extract_timeframe(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    TIMEFRAME_RE
        .find_iter(&lower)
        .find(|m| {
            if m.as_str() != "may" {
                return true;
            }
            let prev = lower[..m.start()].split_whitespace().last().unwrap_or("");
            if MAY_AS_MONTH_AFTER.contains(&prev) {
                return true;
            }
            let next = lower[m.end()..].split_whitespace().next().unwrap_or("");
            !MAY_AS_VERB.contains(&next)
        })
        .map(|m| m.as_str().to_string())
}

pub fn is_metadata_count(text: &str) -> bool {
    METADATA_COUNT_RE.is_match(&normalize(text))
}

pub struct TimeSensitivityClassifier {
    time_keywords: KeywordSet,
    static_keywords: KeywordSet,
}

impl TimeSensitivityClassifier {
    pub fn new() -> Self {
        Self {
            time_keywords: KeywordSet::new(TIME_KEYWORDS),
            static_keywords: KeywordSet::new(STATIC_KEYWORDS),
        }
    }

    pub fn classify(&self, query: &str) -> TimeClassification {
        let normalized = normalize(query);

        if METADATA_COUNT_RE.is_match(&normalized) {
            tracing::debug!(query = %query, "[TimeClassifier] Metadata count, static");
            return TimeClassification::fixed(TimeClass::Static);
        }

        if let Some(timeframe) = extract_timeframe(&normalized) {
            return TimeClassification {
                is_time_sensitive: true,
                needs_clarification: false,
                explicit_timeframe: Some(timeframe),
                classification: TimeClass::Dynamic,
            };
        }

        let has_time = self.time_keywords.find(&normalized).matched;
        let has_static = self.static_keywords.find(&normalized).matched;

        let result = match (has_time, has_static) {
            (true, false) => TimeClassification {
                is_time_sensitive: true,
                needs_clarification: true,
                explicit_timeframe: None,
                classification: TimeClass::Dynamic,
            },
            (false, true) => TimeClassification::fixed(TimeClass::Static),
            // No explicit timeframe at this point, so time keywords alone
            // decide whether to ask
            _ => TimeClassification {
                is_time_sensitive: has_time,
                needs_clarification: has_time,
                explicit_timeframe: None,
                classification: TimeClass::Hybrid,
            },
        };

        tracing::debug!(
            query = %query,
            class = ?result.classification,
            needs_clarification = result.needs_clarification,
            "[TimeClassifier] Classified"
        );
        result
    }
}

impl Default for TimeSensitivityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> TimeClassification {
        TimeSensitivityClassifier::new().classify(q)
    }

    #[test]
    fn test_metadata_count_wins_over_time_keywords() {
        for q in [
            "how many employees",
            "How many branches have the highest sales?",
            "how many products in total",
            "berapa cawangan",
        ] {
            let c = classify(q);
            assert_eq!(c.classification, TimeClass::Static, "{}", q);
            assert!(!c.needs_clarification, "{}", q);
        }
    }

    #[test]
    fn test_explicit_timeframes() {
        let cases = [
            ("total sales in june", "june"),
            ("revenue for 2024-07", "2024-07"),
            ("sales 2024/3 by state", "2024/3"),
            ("top products H1", "h1"),
            ("compare Q3 revenue", "q3"),
            ("jualan bulan mei", "mei"),
            ("sales last month", "last month"),
        ];
        for (q, expected) in cases {
            let c = classify(q);
            assert_eq!(c.classification, TimeClass::Dynamic, "{}", q);
            assert!(c.is_time_sensitive);
            assert!(!c.needs_clarification, "{}", q);
            assert_eq!(c.explicit_timeframe.as_deref(), Some(expected), "{}", q);
        }
    }

    #[test]
    fn test_time_keywords_without_window_need_clarification() {
        let c = classify("total revenue by branch");
        assert_eq!(c.classification, TimeClass::Dynamic);
        assert!(c.needs_clarification);
        assert!(c.explicit_timeframe.is_none());
    }

    #[test]
    fn test_static_only() {
        let c = classify("list all departments");
        assert_eq!(c.classification, TimeClass::Static);
        assert!(!c.is_time_sensitive);
    }

    #[test]
    fn test_hybrid_both_and_neither() {
        let both = classify("which state has the highest sales");
        assert_eq!(both.classification, TimeClass::Hybrid);
        assert!(both.is_time_sensitive);
        assert!(both.needs_clarification);

        let neither = classify("hello there");
        assert_eq!(neither.classification, TimeClass::Hybrid);
        assert!(!neither.is_time_sensitive);
        assert!(!neither.needs_clarification);
    }

    #[test]
    fn test_may_as_verb_is_not_a_month() {
        assert_eq!(extract_timeframe("may i know the sales"), None);
        assert_eq!(extract_timeframe("sales in may 2024").as_deref(), Some("may"));
        assert_eq!(extract_timeframe("which branch may have the highest sales"), None);
        assert_eq!(extract_timeframe("prices may not change"), None);
        // A preceding preposition wins over the following word
        assert_eq!(extract_timeframe("hires in may have doubled").as_deref(), Some("may"));
        assert_eq!(extract_timeframe("may sales by state").as_deref(), Some("may"));
    }

    #[test]
    fn test_may_as_verb_still_asks_for_period() {
        let c = classify("which branch may have the highest sales");
        assert_eq!(c.explicit_timeframe, None);
        assert_eq!(c.classification, TimeClass::Hybrid);
        assert!(c.needs_clarification);
    }
}
