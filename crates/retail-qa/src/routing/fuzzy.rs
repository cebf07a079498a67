//! Typo-tolerant matching and light code-switch normalization.
//!
//! Retail-floor users type fast, misspell, and mix Malay with English.
//! Normalization folds the obvious noise; fuzzy matching absorbs the rest
//! before the keyword lists are consulted.

use std::collections::BTreeSet;

use super::keywords::match_keywords;

/// Default similarity threshold for domain keyword lists.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

/// Words shorter than this only match exactly ("age" must not match "page").
const MIN_FUZZY_LEN: usize = 4;

/// Everyday words that sit close to a domain keyword ("general"/"gender",
/// "status"/"states", "profile"/"profit"). They only ever match exactly.
const COMMON_WORDS: &[&str] = &[
    "there", "their", "where", "overview",
    // gender
    "general", "generally", "generate", "genre",
    // state, states
    "status", "statuses", "stats", "stated", "statement", "statements", "started", "stage",
    "static",
    // channel
    "change", "changes", "changed", "chance", "chances",
    // profit, product, procedure
    "profile", "profiles", "proof", "produce", "project", "proceed",
    // branch, margin, quantity, revenue, transaction
    "brand", "brands", "marine", "quality", "reverse", "translate", "transition",
    "transportation",
    // staff, attrition, turnover, tenure, overtime, resign
    "stuff", "attention", "turned", "tendered", "overtake", "resident",
    // refund, policy
    "refused", "police",
];

/// Malay → English substitutions applied per token.
const CODE_SWITCH: &[(&str, &str)] = &[
    ("jualan", "sales"),
    ("pekerja", "employees"),
    ("kakitangan", "staff"),
    ("cawangan", "branch"),
    ("negeri", "state"),
    ("produk", "product"),
    ("gaji", "salary"),
    ("cuti", "leave"),
    ("polisi", "policy"),
    ("bulan", "month"),
    ("tahun", "year"),
    ("jumlah", "total"),
];

/// Trim, case-fold, strip token punctuation and apply code-switch
/// substitutions. No translation beyond the substitution table.
pub fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .filter_map(|raw| {
            let token = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                return None;
            }
            let replaced = CODE_SWITCH
                .iter()
                .find(|(from, _)| *from == token)
                .map(|(_, to)| (*to).to_string())
                .unwrap_or(token);
            Some(replaced)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized indel similarity: `2 * LCS / (|a| + |b|)`.
///
/// Transpositions cost less than under plain Levenshtein, which is what makes
/// "salse" land close to "sales" (0.8).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Rolling single-row LCS table
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];

    (2 * lcs) as f64 / total as f64
}

/// True iff `word` and `target` are similar enough to count as the same term.
///
/// Fuzzy matches must share their first letter; typos rarely land there and
/// it keeps "payment" away from "department".
pub fn fuzzy_match(word: &str, target: &str, threshold: f64) -> bool {
    let word = word.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    if word.is_empty() || target.is_empty() {
        return false;
    }
    if word == target {
        return true;
    }
    if word.chars().count() < MIN_FUZZY_LEN || target.chars().count() < MIN_FUZZY_LEN {
        return false;
    }
    if word.chars().next() != target.chars().next() {
        return false;
    }
    similarity_ratio(&word, &target) >= threshold
}

/// Distinct keywords from `keywords` found in `text`, exactly or fuzzily.
///
/// Multi-word keywords are compared against token windows of the same width.
pub fn fuzzy_keyword_hits(text: &str, keywords: &[&str], threshold: f64) -> BTreeSet<String> {
    let normalized = normalize(text);
    let mut hits = match_keywords(keywords.iter().copied(), &normalized).keywords;

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.is_empty() {
        return hits;
    }

    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() || hits.contains(&keyword) {
            continue;
        }
        let width = keyword.split_whitespace().count();
        if width == 0 || width > tokens.len() {
            continue;
        }
        let found = tokens
            .windows(width)
            .filter(|window| !(width == 1 && COMMON_WORDS.contains(&window[0])))
            .any(|window| fuzzy_match(&window.join(" "), &keyword, threshold));
        if found {
            hits.insert(keyword);
        }
    }

    hits
}

/// True if any keyword fuzzy-matches some token (or token window) of `text`.
pub fn contains_fuzzy_keyword(text: &str, keywords: &[&str], threshold: f64) -> bool {
    !fuzzy_keyword_hits(text, keywords, threshold).is_empty()
}
