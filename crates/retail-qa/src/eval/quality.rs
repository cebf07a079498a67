//! Answer Quality Evaluation
//!
//! Grades one answer on four dimensions (plus executive format for KPI
//! routes) and folds them into a single score with route-category weights:
//! - semantic relevance: query/answer embedding cosine, or keyword overlap
//!   when no embedding is available
//! - information completeness: required, alternative and bonus terms
//! - factual accuracy: quoted numbers against a range or ground truth
//! - presentation: forbidden content, fabrication language, structure
//!
//! Breakdowns are computed fresh for every (query, answer) pair.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::EvaluationConfig;
use crate::embeddings::{cosine_similarity, EmbeddingModel};
use crate::routing::keywords::KeywordSet;
use crate::types::{Route, RouteCategory};

use super::profile::{profile_for_route, ScoringProfile};
use super::test_case::{AnswerCriteria, TestCase};

// ============================================================================
// Phrase lists
// ============================================================================

const CLARIFICATION_MARKERS: &[&str] = &[
    "could you clarify",
    "can you clarify",
    "could you specify",
    "please specify",
    "please clarify",
    "do you mean",
    "did you mean",
    "which period",
    "which month",
    "which branch",
    "boleh jelaskan",
];

const REFUSAL_MARKERS: &[&str] = &[
    "i don't have",
    "i do not have",
    "outside the scope",
    "out of scope",
    "not able to",
    "unable to",
    "cannot answer",
    "can't answer",
    "no information",
    "not available",
];

const BENCHMARK_PHRASES: &[&str] = &[
    "vs",
    "versus",
    "compared to",
    "compared with",
    "average",
    "benchmark",
    "above",
    "below",
    "higher than",
    "lower than",
    "target",
];

const TREND_PHRASES: &[&str] = &[
    "increased",
    "decreased",
    "increase",
    "decrease",
    "growth",
    "grew",
    "declined",
    "decline",
    "rose",
    "fell",
    "dropped",
    "improved",
    "trend",
    "month-over-month",
    "year-over-year",
    "mom",
    "yoy",
];

const INSIGHT_PHRASES: &[&str] = &[
    "recommend",
    "recommendation",
    "suggests",
    "indicates",
    "key insight",
    "this means",
    "consider",
    "should",
    "opportunity",
];

const FABRICATION_PHRASES: &[&str] = &[
    "i assume",
    "assuming the data",
    "i'm guessing",
    "i am guessing",
    "hypothetically",
    "made-up",
    "fictional",
    "placeholder",
    "dummy data",
    "for illustration only",
];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "what", "which", "who", "how", "many", "much",
    "of", "in", "on", "for", "to", "and", "or", "by", "me", "my", "our", "show", "give", "tell",
    "do", "does", "did", "i", "we", "you", "it", "this", "that", "with", "at", "from", "please",
    "can", "could", "berapa", "apa", "di", "yang", "dan",
];

static CLARIFICATION_SET: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(CLARIFICATION_MARKERS));
static REFUSAL_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(REFUSAL_MARKERS));
static BENCHMARK_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(BENCHMARK_PHRASES));
static TREND_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(TREND_PHRASES));
static INSIGHT_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(INSIGHT_PHRASES));
static FABRICATION_SET: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(FABRICATION_PHRASES));

/// Plain, comma-grouped and currency-prefixed numbers ("RM 99,852.83", "$12").
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:rm|\$)?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)")
        .expect("number regex is valid")
});

static STRUCTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:[-*•]\s|\d+[.)]\s)").expect("structure regex is valid")
});

// ============================================================================
// Scores
// ============================================================================

const CLARIFICATION_SCORE: f64 = 0.9;
const REFUSAL_SCORE: f64 = 0.8;
const PARTIAL_CREDIT_FLOOR: f64 = 0.3;
const LONG_ANSWER_CHARS: usize = 300;

/// Per-dimension scores, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub semantic_similarity: f64,
    pub information_completeness: f64,
    pub factual_accuracy: f64,
    pub presentation_quality: f64,
    /// KPI routes only
    pub executive_format: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub quality_score: f64,
    pub breakdown: QualityBreakdown,
    pub justification: String,
}

/// Numbers quoted in `text`, commas removed.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

fn contains_ci(haystack_lower: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack_lower.contains(&needle)
}

// ============================================================================
// Evaluator
// ============================================================================

pub struct AnswerQualityEvaluator {
    embedder: Option<Arc<dyn EmbeddingModel>>,
    /// Expected headline value per test-case id
    ground_truth: HashMap<String, f64>,
    config: EvaluationConfig,
    fallback_warned: AtomicBool,
}

impl AnswerQualityEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            embedder: None,
            ground_truth: HashMap::new(),
            config,
            fallback_warned: AtomicBool::new(false),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingModel>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_ground_truth(mut self, ground_truth: HashMap<String, f64>) -> Self {
        self.ground_truth = ground_truth;
        self
    }

    pub fn evaluate(
        &self,
        query: &str,
        answer: &str,
        test_case: &TestCase,
        actual_route: Route,
    ) -> QualityAssessment {
        let profile = profile_for_route(actual_route);
        let criteria = &test_case.criteria;
        let lower = answer.to_lowercase();
        let chars = answer.chars().count();
        let numbers = extract_numbers(answer);

        let (semantic, semantic_note) =
            self.semantic_relevance(query, answer, &lower, chars, criteria, profile);
        let (completeness, completeness_note) = completeness(&lower, chars, criteria);
        let (accuracy, accuracy_note) =
            self.factual_accuracy(&numbers, &test_case.id, criteria, profile.category);
        let (presentation, presentation_note) = presentation(answer, &lower, chars, criteria);
        let executive = (profile.category == RouteCategory::Kpi)
            .then(|| executive_format(&lower, chars, !numbers.is_empty()));

        let w = &profile.weights;
        let quality_score = (w.semantic * semantic
            + w.completeness * completeness
            + w.accuracy * accuracy
            + w.presentation * presentation
            + w.executive_format * executive.as_ref().map(|(s, _)| *s).unwrap_or(1.0))
        .clamp(0.0, 1.0);

        let mut justification = format!(
            "semantic {:.2} ({}); completeness {:.2} ({}); accuracy {:.2} ({}); presentation {:.2} ({})",
            semantic,
            semantic_note,
            completeness,
            completeness_note,
            accuracy,
            accuracy_note,
            presentation,
            presentation_note
        );
        if let Some((score, note)) = &executive {
            justification.push_str(&format!("; executive format {:.2} ({})", score, note));
        }

        tracing::debug!(
            case = %test_case.id,
            route = %actual_route,
            quality_score,
            "[QualityEval] Answer graded"
        );

        QualityAssessment {
            quality_score,
            breakdown: QualityBreakdown {
                semantic_similarity: semantic,
                information_completeness: completeness,
                factual_accuracy: accuracy,
                presentation_quality: presentation,
                executive_format: executive.map(|(s, _)| s),
            },
            justification,
        }
    }

    fn semantic_relevance(
        &self,
        query: &str,
        answer: &str,
        answer_lower: &str,
        chars: usize,
        criteria: &AnswerCriteria,
        profile: &ScoringProfile,
    ) -> (f64, String) {
        if criteria.clarification_expected && CLARIFICATION_SET.find(answer_lower).matched {
            return (CLARIFICATION_SCORE, "asked for clarification as expected".into());
        }
        if criteria.out_of_scope && REFUSAL_SET.find(answer_lower).matched {
            return (REFUSAL_SCORE, "declined an out-of-scope request".into());
        }

        let Some(cosine) = self.embedding_similarity(query, answer) else {
            return keyword_overlap(query, answer_lower, criteria);
        };

        let threshold = profile
            .semantic_threshold
            .or(criteria.min_semantic_similarity)
            .unwrap_or(self.config.default_semantic_threshold);

        if cosine < threshold {
            let score = cosine.max(PARTIAL_CREDIT_FLOOR);
            return (
                score,
                format!("cosine {:.2} below {:.2}, partial credit", cosine, threshold),
            );
        }

        if !profile.semantic_bonuses {
            return (cosine, format!("cosine {:.2}", cosine));
        }

        let mut bonus = 0.0;
        if BENCHMARK_SET.find(answer_lower).matched {
            bonus += 0.10;
        }
        if TREND_SET.find(answer_lower).matched {
            bonus += 0.10;
        }
        if chars >= LONG_ANSWER_CHARS {
            bonus += 0.05;
        }
        (
            (cosine + bonus).min(1.0),
            format!("cosine {:.2} + {:.2} report bonus", cosine, bonus),
        )
    }

    /// Cosine in [0, 1], or `None` when no embedding can be produced.
    fn embedding_similarity(&self, query: &str, answer: &str) -> Option<f64> {
        let Some(embedder) = &self.embedder else {
            self.warn_fallback("no embedding model configured");
            return None;
        };
        match (embedder.encode(query), embedder.encode(answer)) {
            (Ok(q), Ok(a)) => Some((cosine_similarity(&q, &a) as f64).clamp(0.0, 1.0)),
            (Err(e), _) | (_, Err(e)) => {
                self.warn_fallback(&e.to_string());
                None
            }
        }
    }

    fn warn_fallback(&self, why: &str) {
        if !self.fallback_warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(reason = why, "[QualityEval] Using keyword overlap for semantic relevance");
        }
    }

    fn factual_accuracy(
        &self,
        numbers: &[f64],
        case_id: &str,
        criteria: &AnswerCriteria,
        category: RouteCategory,
    ) -> (f64, String) {
        if numbers.is_empty() {
            return match category {
                RouteCategory::Kpi => (0.5, "no figures in a KPI answer".into()),
                RouteCategory::General => (0.75, "no figures to check".into()),
            };
        }

        if let Some((min, max)) = criteria.numerical_range {
            return if numbers.iter().any(|n| (min..=max).contains(n)) {
                (0.95, format!("figure within [{}, {}]", min, max))
            } else {
                (0.4, format!("no figure within [{}, {}]", min, max))
            };
        }

        if let Some(&expected) = self.ground_truth.get(case_id) {
            let tolerance = self.config.ground_truth_tolerance;
            let close = numbers
                .iter()
                .any(|n| (n - expected).abs() <= tolerance * expected.abs().max(f64::EPSILON));
            return if close {
                (0.95, format!("matches ground truth {}", expected))
            } else {
                (0.5, format!("no figure near ground truth {}", expected))
            };
        }

        (0.75, "figures present, nothing to check against".into())
    }
}

// ============================================================================
// Dimensions without evaluator state
// ============================================================================

fn keyword_overlap(query: &str, answer_lower: &str, criteria: &AnswerCriteria) -> (f64, String) {
    let terms: BTreeSet<String> = query
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| t.chars().count() > 2 && !STOPWORDS.contains(&t.as_str()))
        .collect();

    let mut score = if terms.is_empty() {
        0.5
    } else {
        let answer = KeywordSet::new(&terms).find(answer_lower);
        answer.keywords.len() as f64 / terms.len() as f64
    };

    if !criteria.must_contain.is_empty()
        && criteria.must_contain.iter().all(|t| contains_ci(answer_lower, t))
    {
        score += 0.2;
    }

    (
        score.clamp(PARTIAL_CREDIT_FLOOR, 1.0),
        "keyword overlap, no embedding".into(),
    )
}

fn completeness(answer_lower: &str, chars: usize, criteria: &AnswerCriteria) -> (f64, String) {
    let mut score = 0.5;
    let mut notes = Vec::new();

    if !criteria.must_contain.is_empty() {
        let present = criteria
            .must_contain
            .iter()
            .filter(|t| contains_ci(answer_lower, t))
            .count();
        let fraction = present as f64 / criteria.must_contain.len() as f64;
        score = if present == criteria.must_contain.len() {
            0.9
        } else {
            fraction
        };
        notes.push(format!("{}/{} required", present, criteria.must_contain.len()));
    }

    if criteria
        .must_contain_any
        .iter()
        .any(|t| contains_ci(answer_lower, t))
    {
        score = f64::max(score, 0.75);
        notes.push("one alternative present".to_string());
    }

    let bonus_hits = criteria
        .acceptable_if_includes
        .iter()
        .filter(|t| contains_ci(answer_lower, t))
        .count();
    if bonus_hits > 0 {
        score += (0.05 * bonus_hits as f64).min(0.2);
        notes.push(format!("{} bonus terms", bonus_hits));
    }

    if chars < 50 {
        score *= 0.7;
        notes.push("too short".to_string());
    } else if chars > 200 {
        score += 0.05;
    }

    let note = if notes.is_empty() {
        "no criteria".to_string()
    } else {
        notes.join(", ")
    };
    (score.clamp(0.0, 1.0), note)
}

fn presentation(
    answer: &str,
    answer_lower: &str,
    chars: usize,
    criteria: &AnswerCriteria,
) -> (f64, String) {
    let mut score = 0.8;
    let mut notes = Vec::new();

    let violations = criteria
        .must_not_contain
        .iter()
        .filter(|t| contains_ci(answer_lower, t))
        .count();
    if violations > 0 {
        score -= 0.15 * violations as f64;
        notes.push(format!("{} forbidden terms", violations));
    }

    if FABRICATION_SET.find(answer_lower).matched {
        score -= 0.2;
        notes.push("fabrication language".to_string());
    }

    if answer.trim().contains('\n') || STRUCTURE_RE.is_match(answer) {
        score += 0.1;
        notes.push("structured".to_string());
    }

    if chars < 30 {
        score *= 0.6;
        notes.push("very short".to_string());
    }

    let note = if notes.is_empty() {
        "plain".to_string()
    } else {
        notes.join(", ")
    };
    (score.clamp(0.0, 1.0), note)
}

fn executive_format(answer_lower: &str, chars: usize, has_numbers: bool) -> (f64, String) {
    let mut score = 0.0;
    let mut present = Vec::new();

    if has_numbers {
        score += 0.30;
        present.push("figures");
    }
    if BENCHMARK_SET.find(answer_lower).matched {
        score += 0.25;
        present.push("benchmark");
    }
    if TREND_SET.find(answer_lower).matched {
        score += 0.25;
        present.push("trend");
    }
    if INSIGHT_SET.find(answer_lower).matched {
        score += 0.20;
        present.push("insight");
    } else if chars >= LONG_ANSWER_CHARS {
        score += 0.10;
        present.push("length");
    }

    let note = if present.is_empty() {
        "no report features".to_string()
    } else {
        present.join(", ")
    };
    (f64::min(score, 1.0), note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    fn case(route: Route, criteria: AnswerCriteria) -> TestCase {
        TestCase::strict("t-1", "total sales in june", route, criteria).unwrap()
    }

    fn evaluator() -> AnswerQualityEvaluator {
        AnswerQualityEvaluator::new(EvaluationConfig::default())
    }

    fn sales_report() -> String {
        let mut answer = String::from(
            "Total sales for June reached RM 99,852.83, vs average of RM 89,000 across branches. \
             Sales increased compared with May. ",
        );
        while answer.len() < 450 {
            answer.push_str("Selangor and Johor led the result. ");
        }
        answer.truncate(450);
        answer
    }

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("RM 99,852.83 and $12"), vec![99852.83, 12.0]);
        assert_eq!(extract_numbers("up 12.5% from 1,200"), vec![12.5, 1200.0]);
        assert!(extract_numbers("no figures here").is_empty());
    }

    #[test]
    fn test_executive_format_for_sales_report() {
        let answer = sales_report();
        assert_eq!(answer.chars().count(), 450);
        let result = evaluator().evaluate(
            "total sales in june",
            &answer,
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        let exec = result.breakdown.executive_format.unwrap();
        assert!(exec >= 0.75, "executive format {}", exec);
        assert!((exec - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_non_kpi_route_has_no_executive_dimension() {
        let result = evaluator().evaluate(
            "annual leave policy",
            "Staff get 14 days of annual leave per year.",
            &case(Route::RagDocs, AnswerCriteria::default()),
            Route::RagDocs,
        );
        assert!(result.breakdown.executive_format.is_none());
        assert!(!result.justification.contains("executive"));
    }

    #[test]
    fn test_clarification_marker_scores_high() {
        let criteria = AnswerCriteria {
            clarification_expected: true,
            ..Default::default()
        };
        let result = evaluator().evaluate(
            "sales",
            "Could you clarify which month you are interested in?",
            &case(Route::SalesKpi, criteria),
            Route::SalesKpi,
        );
        assert_eq!(result.breakdown.semantic_similarity, 0.9);
    }

    #[test]
    fn test_graceful_refusal_scores_fixed() {
        let criteria = AnswerCriteria {
            out_of_scope: true,
            ..Default::default()
        };
        let result = evaluator().evaluate(
            "what is the weather tomorrow",
            "Sorry, weather forecasts are outside the scope of this assistant.",
            &case(Route::RagDocs, criteria),
            Route::RagDocs,
        );
        assert_eq!(result.breakdown.semantic_similarity, 0.8);
    }

    #[test]
    fn test_keyword_overlap_fallback() {
        let result = evaluator().evaluate(
            "total sales in june",
            "Total sales in June were RM 10,000.",
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        // total, sales, june all present
        assert!((result.breakdown.semantic_similarity - 1.0).abs() < 1e-9);
        assert!(result.justification.contains("keyword overlap"));

        let result = evaluator().evaluate(
            "total sales in june",
            "Hello there, nothing relevant.",
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        assert_eq!(result.breakdown.semantic_similarity, 0.3);
    }

    #[test]
    fn test_embedding_similarity_is_bounded() {
        let evaluator = evaluator().with_embedder(Arc::new(HashingEmbedder::default()));
        let result = evaluator.evaluate(
            "total sales in june",
            &sales_report(),
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        let s = result.breakdown.semantic_similarity;
        assert!((0.3..=1.0).contains(&s), "semantic {}", s);
        assert!(result.justification.contains("cosine"));
    }

    /// Embeds `query` as a unit vector and anything else at a fixed cosine to it.
    struct FixedCosine {
        query: String,
        cosine: f32,
    }

    impl FixedCosine {
        fn evaluator(query: &str, cosine: f32) -> AnswerQualityEvaluator {
            AnswerQualityEvaluator::new(EvaluationConfig::default()).with_embedder(Arc::new(
                Self {
                    query: query.to_string(),
                    cosine,
                },
            ))
        }
    }

    impl EmbeddingModel for FixedCosine {
        fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text == self.query {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![self.cosine, (1.0 - self.cosine * self.cosine).sqrt()])
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn semantic(
        evaluator: &AnswerQualityEvaluator,
        answer: &str,
        criteria: AnswerCriteria,
        route: Route,
    ) -> f64 {
        evaluator
            .evaluate("total sales in june", answer, &case(route, criteria), route)
            .breakdown
            .semantic_similarity
    }

    #[test]
    fn test_kpi_semantic_bonuses() {
        let report = sales_report();

        // benchmark + trend + length = 0.25
        let ev = FixedCosine::evaluator("total sales in june", 0.6);
        let s = semantic(&ev, &report, AnswerCriteria::default(), Route::SalesKpi);
        assert!((s - 0.85).abs() < 1e-6, "semantic {}", s);

        // benchmark only
        let s = semantic(&ev, "Sales were above target.", AnswerCriteria::default(), Route::SalesKpi);
        assert!((s - 0.7).abs() < 1e-6, "semantic {}", s);

        // capped
        let ev = FixedCosine::evaluator("total sales in june", 0.9);
        let s = semantic(&ev, &report, AnswerCriteria::default(), Route::HrKpi);
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_kpi_semantic_below_threshold_gets_no_bonus() {
        let report = sales_report();

        let ev = FixedCosine::evaluator("total sales in june", 0.45);
        let s = semantic(&ev, &report, AnswerCriteria::default(), Route::SalesKpi);
        assert!((s - 0.45).abs() < 1e-6, "semantic {}", s);

        let ev = FixedCosine::evaluator("total sales in june", 0.1);
        let s = semantic(&ev, &report, AnswerCriteria::default(), Route::SalesKpi);
        assert!((s - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_general_semantic_threshold_and_override() {
        let report = sales_report();

        // No bonuses on general routes, even for report-style answers
        let ev = FixedCosine::evaluator("total sales in june", 0.8);
        let r = ev.evaluate(
            "total sales in june",
            &report,
            &case(Route::RagDocs, AnswerCriteria::default()),
            Route::RagDocs,
        );
        assert!((r.breakdown.semantic_similarity - 0.8).abs() < 1e-6);
        assert!(!r.justification.contains("partial credit"));

        // Default threshold 0.75
        let ev = FixedCosine::evaluator("total sales in june", 0.7);
        let r = ev.evaluate(
            "total sales in june",
            &report,
            &case(Route::RagDocs, AnswerCriteria::default()),
            Route::RagDocs,
        );
        assert!((r.breakdown.semantic_similarity - 0.7).abs() < 1e-6);
        assert!(r.justification.contains("below 0.75"));

        // Per-case threshold replaces the default
        let relaxed = AnswerCriteria {
            min_semantic_similarity: Some(0.6),
            ..Default::default()
        };
        let r = ev.evaluate("total sales in june", &report, &case(Route::RagDocs, relaxed), Route::RagDocs);
        assert!((r.breakdown.semantic_similarity - 0.7).abs() < 1e-6);
        assert!(!r.justification.contains("partial credit"));

        let ev = FixedCosine::evaluator("total sales in june", 0.2);
        let s = semantic(&ev, &report, AnswerCriteria::default(), Route::RagDocs);
        assert!((s - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_answer_is_embedded_as_written() {
        // Lowercasing the answer would make it equal to the query text
        let ev = FixedCosine::evaluator("total sales in june", 0.1);
        let s = semantic(&ev, "TOTAL SALES IN JUNE", AnswerCriteria::default(), Route::RagDocs);
        assert!((s - 0.3).abs() < 1e-9, "semantic {}", s);
    }

    #[test]
    fn test_repeated_query_terms_count_once() {
        let r = evaluator().evaluate(
            "sales sales sales",
            "Sales were RM 10,000 in June.",
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        assert!((r.breakdown.semantic_similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_completeness_rules() {
        let long = "x".repeat(120);
        let criteria = AnswerCriteria {
            must_contain: vec!["june".into(), "rm".into()],
            ..Default::default()
        };
        let (score, _) = completeness(&format!("june rm {}", long), 127, &criteria);
        assert!((score - 0.9).abs() < 1e-9);

        let (score, _) = completeness(&format!("june {}", long), 125, &criteria);
        assert!((score - 0.5).abs() < 1e-9);

        let criteria = AnswerCriteria {
            must_contain_any: vec!["johor".into(), "penang".into()],
            acceptable_if_includes: vec!["growth".into(), "branch".into()],
            ..Default::default()
        };
        let (score, _) = completeness(&format!("penang growth branch {}", long), 140, &criteria);
        assert!((score - 0.85).abs() < 1e-9);

        // Short answers are penalized
        let (score, _) = completeness("june", 4, &AnswerCriteria::default());
        assert!((score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_range_and_ground_truth() {
        let in_range = AnswerCriteria {
            numerical_range: Some((90_000.0, 110_000.0)),
            ..Default::default()
        };
        let r = evaluator().evaluate(
            "total sales in june",
            "Sales were RM 99,852.83",
            &case(Route::SalesKpi, in_range.clone()),
            Route::SalesKpi,
        );
        assert_eq!(r.breakdown.factual_accuracy, 0.95);

        let r = evaluator().evaluate(
            "total sales in june",
            "Sales were RM 5,000",
            &case(Route::SalesKpi, in_range),
            Route::SalesKpi,
        );
        assert_eq!(r.breakdown.factual_accuracy, 0.4);

        let truth = HashMap::from([("t-1".to_string(), 100_000.0)]);
        let ev = evaluator().with_ground_truth(truth);
        let r = ev.evaluate(
            "total sales in june",
            "Sales were RM 97,000",
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        assert_eq!(r.breakdown.factual_accuracy, 0.95);
        let r = ev.evaluate(
            "total sales in june",
            "Sales were RM 80,000",
            &case(Route::SalesKpi, AnswerCriteria::default()),
            Route::SalesKpi,
        );
        assert_eq!(r.breakdown.factual_accuracy, 0.5);
    }

    #[test]
    fn test_accuracy_without_numbers_depends_on_route() {
        let c = case(Route::SalesKpi, AnswerCriteria::default());
        let kpi = evaluator().evaluate("q", "Sales went well.", &c, Route::SalesKpi);
        let docs = evaluator().evaluate("q", "Sales went well.", &c, Route::RagDocs);
        assert_eq!(kpi.breakdown.factual_accuracy, 0.5);
        assert_eq!(docs.breakdown.factual_accuracy, 0.75);
    }

    #[test]
    fn test_presentation_penalties_and_structure() {
        let criteria = AnswerCriteria {
            must_not_contain: vec!["bitcoin".into()],
            ..Default::default()
        };
        let text = "Sales by state:\n- Selangor RM 10,000\n- Johor RM 8,000";
        let (score, _) = presentation(text, &text.to_lowercase(), text.len(), &criteria);
        assert!((score - 0.9).abs() < 1e-9);

        let text = "Assuming the data is right, we also sold bitcoin worth RM 5,000 today.";
        let (score, note) = presentation(text, &text.to_lowercase(), text.len(), &criteria);
        assert!((score - 0.45).abs() < 1e-9);
        assert!(note.contains("fabrication"));

        let (score, _) = presentation("ok", "ok", 2, &AnswerCriteria::default());
        assert!((score - 0.48).abs() < 1e-9);
    }

    #[test]
    fn test_quality_score_is_weighted_sum() {
        let r = evaluator().evaluate(
            "annual leave policy",
            "Staff are entitled to 14 days of annual leave under the leave policy.",
            &case(Route::RagDocs, AnswerCriteria::default()),
            Route::RagDocs,
        );
        let b = &r.breakdown;
        let expected = 0.25 * b.semantic_similarity
            + 0.30 * b.information_completeness
            + 0.30 * b.factual_accuracy
            + 0.15 * b.presentation_quality;
        assert!((r.quality_score - expected).abs() < 1e-9);
    }
}
