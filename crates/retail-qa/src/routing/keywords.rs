//! Keyword Matching
//!
//! Boundary-safe keyword detection against curated per-domain lists.
//! Single words match on `\b…\b` so "age" never fires inside "average" or
//! "percentage"; multi-word phrases match as plain substrings.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Route;

// ============================================================================
// Domain vocabularies
// ============================================================================

pub const HR_KEYWORDS: &[&str] = &[
    "headcount",
    "employee",
    "employees",
    "staff",
    "workforce",
    "attrition",
    "turnover",
    "resignation",
    "resign",
    "hiring",
    "new hires",
    "recruitment",
    "salary",
    "payroll",
    "department",
    "tenure",
    "age",
    "gender",
    "overtime",
    "absenteeism",
    "performance rating",
    "manpower",
    // Malay terms the normalizer does not translate
    "jabatan",
];

pub const SALES_KEYWORDS: &[&str] = &[
    "sales",
    "revenue",
    "transaction",
    "transactions",
    "product",
    "products",
    "branch",
    "branches",
    "state",
    "states",
    "units sold",
    "top selling",
    "best selling",
    "basket size",
    "average order value",
    "profit",
    "margin",
    "sku",
    "quantity",
    "channel",
    "hasil",
];

pub const POLICY_KEYWORDS: &[&str] = &[
    "policy",
    "policies",
    "sop",
    "procedure",
    "guideline",
    "guidelines",
    "handbook",
    "leave",
    "annual leave",
    "medical leave",
    "claim",
    "refund",
    "return policy",
    "dress code",
    "code of conduct",
    "benefits",
    "entitlement",
    "how to apply",
    "rules",
    "tuntutan",
    "prosedur",
];

/// Domain words that, alone in a very short query, are a best guess rather
/// than a confident match.
pub const AMBIGUOUS_DOMAIN_WORDS: &[(&str, Route)] = &[
    ("staff", Route::HrKpi),
    ("employee", Route::HrKpi),
    ("employees", Route::HrKpi),
    ("sales", Route::SalesKpi),
    ("revenue", Route::SalesKpi),
    ("policy", Route::RagDocs),
    ("leave", Route::RagDocs),
];

// ============================================================================
// Matcher
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub matched: bool,
    pub keywords: BTreeSet<String>,
}

enum Pattern {
    /// Single word, boundary-anchored
    Word(Regex),
    /// Multi-word phrase, substring containment
    Phrase(String),
}

/// Precompiled keyword list.
pub struct KeywordSet {
    entries: Vec<(String, Pattern)>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = keywords
            .into_iter()
            .filter_map(|k| {
                let keyword = k.as_ref().trim().to_lowercase();
                if keyword.is_empty() {
                    return None;
                }
                let pattern = if keyword.contains(char::is_whitespace) {
                    Pattern::Phrase(keyword.clone())
                } else {
                    // Escaped input always yields a valid pattern
                    Regex::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                        .ok()
                        .map(Pattern::Word)?
                };
                Some((keyword, pattern))
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn find(&self, text: &str) -> KeywordMatch {
        if text.trim().is_empty() {
            return KeywordMatch::default();
        }
        let lower = text.to_lowercase();
        let keywords: BTreeSet<String> = self
            .entries
            .iter()
            .filter(|(_, pattern)| match pattern {
                Pattern::Word(re) => re.is_match(&lower),
                Pattern::Phrase(phrase) => lower.contains(phrase.as_str()),
            })
            .map(|(k, _)| k.clone())
            .collect();

        KeywordMatch {
            matched: !keywords.is_empty(),
            keywords,
        }
    }
}

/// One-shot match of `keywords` against `text`. Never fails.
pub fn match_keywords<I, S>(keywords: I, text: &str) -> KeywordMatch
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    KeywordSet::new(keywords).find(text)
}
