//! Offline suite evaluation.
//!
//! Routes, answers and scores a labeled corpus in parallel, then aggregates
//! the verdicts. The same corpus can be run through several routing
//! strategies side by side to compare routing accuracy alone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EvaluationConfig;
use crate::error::QaError;
use crate::routing::QueryRouter;
use crate::types::{Query, Route, RoutingDecision};

use super::quality::AnswerQualityEvaluator;
use super::scoring::{
    evaluate_case, score_route, EvaluationResult, FinalStatus, RouteStatus, TwoTierCombiner,
};
use super::test_case::TestCase;

/// One case as it went through the suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub query: String,
    pub preferred_route: Route,
    pub decision: RoutingDecision,
    pub answer: String,
    pub result: EvaluationResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteSummary {
    pub cases: usize,
    pub mean_quality: f64,
    pub mean_overall: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub perfect: usize,
    pub acceptable: usize,
    pub failed: usize,
    pub route_perfect: usize,
    pub route_acceptable: usize,
    pub route_wrong: usize,
    pub mean_quality: f64,
    pub mean_overall: f64,
    /// Keyed by the route that actually answered
    pub per_route: BTreeMap<Route, RouteSummary>,
}

impl SuiteSummary {
    fn from_results<'a>(results: impl Iterator<Item = &'a EvaluationResult>) -> Self {
        let mut summary = Self::default();
        let mut quality_sum = 0.0;
        let mut overall_sum = 0.0;

        for r in results {
            summary.total += 1;
            match r.final_status {
                FinalStatus::Perfect => summary.perfect += 1,
                FinalStatus::Acceptable => summary.acceptable += 1,
                FinalStatus::Failed => summary.failed += 1,
            }
            match r.route_status {
                RouteStatus::Perfect => summary.route_perfect += 1,
                RouteStatus::Acceptable => summary.route_acceptable += 1,
                RouteStatus::Wrong => summary.route_wrong += 1,
            }
            quality_sum += r.quality_score;
            overall_sum += r.overall_score;

            // Running sums first; converted to means below
            let entry = summary.per_route.entry(r.actual_route).or_default();
            entry.cases += 1;
            entry.mean_quality += r.quality_score;
            entry.mean_overall += r.overall_score;
        }

        let n = summary.total.max(1) as f64;
        summary.mean_quality = quality_sum / n;
        summary.mean_overall = overall_sum / n;
        for entry in summary.per_route.values_mut() {
            let n = entry.cases.max(1) as f64;
            entry.mean_quality /= n;
            entry.mean_overall /= n;
        }
        summary
    }

    /// Fraction of cases that did not fail.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.perfect + self.acceptable) as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Name of the routing strategy under test
    pub strategy: String,
    pub records: Vec<CaseRecord>,
    pub summary: SuiteSummary,
}

impl SuiteReport {
    pub fn failed(&self) -> impl Iterator<Item = &CaseRecord> {
        self.records
            .iter()
            .filter(|r| r.result.final_status == FinalStatus::Failed)
    }
}

// ============================================================================
// Runner
// ============================================================================

pub struct SuiteRunner {
    evaluator: AnswerQualityEvaluator,
    combiner: TwoTierCombiner,
    config: EvaluationConfig,
}

impl SuiteRunner {
    pub fn new(evaluator: AnswerQualityEvaluator, config: EvaluationConfig) -> Self {
        Self {
            evaluator,
            combiner: TwoTierCombiner::new(),
            config,
        }
    }

    /// Route every case, obtain its answer from `answer_fn`, and score it.
    /// Records keep the input order.
    pub fn run<F>(
        &self,
        cases: &[TestCase],
        router: &dyn QueryRouter,
        answer_fn: F,
    ) -> Result<SuiteReport, QaError>
    where
        F: Fn(&TestCase, &RoutingDecision) -> String + Sync,
    {
        let start = std::time::Instant::now();
        let score_all = || -> Vec<CaseRecord> {
            cases
                .par_iter()
                .map(|case| {
                    let decision = router.route(&Query::new(case.query.as_str()));
                    let answer = answer_fn(case, &decision);
                    let result =
                        evaluate_case(case, &decision, &answer, &self.evaluator, &self.combiner);
                    CaseRecord {
                        query: case.query.clone(),
                        preferred_route: case.preferred_route,
                        decision,
                        answer,
                        result,
                    }
                })
                .collect()
        };

        let records = if self.config.parallelism > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallelism)
                .build()
                .map_err(|e| QaError::Config(format!("evaluation thread pool: {}", e)))?;
            pool.install(score_all)
        } else {
            score_all()
        };

        let summary = SuiteSummary::from_results(records.iter().map(|r| &r.result));
        tracing::info!(
            strategy = router.name(),
            cases = summary.total,
            perfect = summary.perfect,
            acceptable = summary.acceptable,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "[Eval] Suite finished"
        );

        Ok(SuiteReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            strategy: router.name().to_string(),
            records,
            summary,
        })
    }
}

// ============================================================================
// Strategy comparison
// ============================================================================

/// Routing-only scores of one strategy over a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub name: String,
    pub cases: usize,
    pub perfect: usize,
    pub acceptable: usize,
    pub wrong: usize,
    pub mean_route_score: f64,
    pub mean_confidence: f64,
}

impl StrategyComparison {
    pub fn perfect_rate(&self) -> f64 {
        self.perfect as f64 / self.cases.max(1) as f64
    }

    pub fn acceptable_rate(&self) -> f64 {
        self.acceptable as f64 / self.cases.max(1) as f64
    }

    pub fn wrong_rate(&self) -> f64 {
        self.wrong as f64 / self.cases.max(1) as f64
    }
}

/// Route every case with each named strategy; no answers are produced.
pub fn compare_strategies(
    cases: &[TestCase],
    strategies: &[(&str, &dyn QueryRouter)],
) -> Vec<StrategyComparison> {
    strategies
        .iter()
        .map(|(name, router)| {
            let scored: Vec<(f64, RouteStatus, f32)> = cases
                .par_iter()
                .map(|case| {
                    let decision = router.route(&Query::new(case.query.as_str()));
                    let (score, status) = score_route(decision.route, case);
                    (score, status, decision.confidence)
                })
                .collect();

            let count = |s: RouteStatus| scored.iter().filter(|(_, st, _)| *st == s).count();
            let n = scored.len().max(1) as f64;
            let comparison = StrategyComparison {
                name: (*name).to_string(),
                cases: scored.len(),
                perfect: count(RouteStatus::Perfect),
                acceptable: count(RouteStatus::Acceptable),
                wrong: count(RouteStatus::Wrong),
                mean_route_score: scored.iter().map(|(s, _, _)| s).sum::<f64>() / n,
                mean_confidence: scored.iter().map(|(_, _, c)| *c as f64).sum::<f64>() / n,
            };
            tracing::debug!(
                strategy = %comparison.name,
                perfect = comparison.perfect,
                wrong = comparison.wrong,
                "[Eval] Strategy compared"
            );
            comparison
        })
        .collect()
}

// ============================================================================
// Text reports
// ============================================================================

/// Format a suite report as a human-readable summary.
pub fn format_report(report: &SuiteReport) -> String {
    let s = &report.summary;
    let mut out = String::new();

    out.push_str(&format!(
        "=== Answer Evaluation Report: {} ({} cases) ===\n",
        report.strategy, s.total
    ));
    out.push_str(&format!(
        "Run {} at {}\n\n",
        report.run_id,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str(&format!(
        "Final:  PERFECT {} | ACCEPTABLE {} | FAILED {} (pass rate {:.1}%)\n",
        s.perfect,
        s.acceptable,
        s.failed,
        s.pass_rate() * 100.0
    ));
    out.push_str(&format!(
        "Routing: PERFECT {} | ACCEPTABLE {} | WRONG {}\n",
        s.route_perfect, s.route_acceptable, s.route_wrong
    ));
    out.push_str(&format!(
        "Mean quality {:.3}, mean overall {:.3}\n\n",
        s.mean_quality, s.mean_overall
    ));

    out.push_str("| Route     | Cases | Quality | Overall |\n");
    out.push_str("|-----------|-------|---------|---------|\n");
    for (route, r) in &s.per_route {
        out.push_str(&format!(
            "| {:<9} | {:5} | {:.4}  | {:.4}  |\n",
            route.as_str(),
            r.cases,
            r.mean_quality,
            r.mean_overall
        ));
    }

    let failed: Vec<&CaseRecord> = report.failed().collect();
    if !failed.is_empty() {
        out.push_str(&format!("\n--- Failed cases ({}/{}) ---\n", failed.len(), s.total));
        for record in failed {
            out.push_str(&format!(
                "  - [{}] \"{}\" routed {} (expected {}), quality {:.2}: {}\n",
                record.result.case_id,
                record.query,
                record.decision.route,
                record.preferred_route,
                record.result.quality_score,
                record.result.justification
            ));
        }
    }

    out
}

pub fn format_comparison(comparisons: &[StrategyComparison]) -> String {
    let mut out = String::from("| Strategy | Cases | Perfect | Acceptable | Wrong  | Confidence |\n");
    out.push_str("|----------|-------|---------|------------|--------|------------|\n");
    for c in comparisons {
        out.push_str(&format!(
            "| {:<8} | {:5} | {:6.1}% | {:9.1}% | {:5.1}% | {:.3}      |\n",
            c.name,
            c.cases,
            c.perfect_rate() * 100.0,
            c.acceptable_rate() * 100.0,
            c.wrong_rate() * 100.0,
            c.mean_confidence
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_case::{parse_test_cases, AnswerCriteria};
    use crate::routing::KeywordRouter;

    /// Always answers from the document handler.
    struct DocsOnly;

    impl QueryRouter for DocsOnly {
        fn route(&self, query: &Query) -> RoutingDecision {
            RoutingDecision::new(Route::RagDocs, query.text.to_lowercase(), 0.5, "fixed")
        }

        fn name(&self) -> &'static str {
            "docs_only"
        }
    }

    fn corpus() -> Vec<TestCase> {
        parse_test_cases(
            r#"[
                {"id": "hr-1", "query": "headcount by department", "preferred_route": "hr_kpi",
                 "answer_criteria": {"must_contain": ["headcount"]}},
                {"id": "sales-1", "query": "total sales by state", "preferred_route": "sales_kpi",
                 "acceptable_routes": ["sales_kpi", "rag_docs"]},
                {"id": "doc-1", "query": "annual leave policy", "preferred_route": "rag_docs"}
            ]"#,
        )
        .unwrap()
    }

    fn canned_answer(case: &TestCase, _decision: &RoutingDecision) -> String {
        match case.id.as_str() {
            "hr-1" => "Headcount by department:\n- Sales 120\n- Operations 85\nTotal headcount 205, above the 200 target and increased from last quarter.".into(),
            "sales-1" => "Total sales by state:\n- Selangor RM 120,000\n- Johor RM 95,000\nSales rose vs the monthly average.".into(),
            _ => "ok".into(),
        }
    }

    fn runner(parallelism: usize) -> SuiteRunner {
        let config = EvaluationConfig {
            parallelism,
            ..Default::default()
        };
        SuiteRunner::new(AnswerQualityEvaluator::new(config.clone()), config)
    }

    #[test]
    fn test_run_keeps_order_and_counts() {
        let cases = corpus();
        let report = runner(0)
            .run(&cases, &KeywordRouter::default(), canned_answer)
            .unwrap();

        assert_eq!(report.strategy, "keyword");
        let ids: Vec<&str> = report.records.iter().map(|r| r.result.case_id.as_str()).collect();
        assert_eq!(ids, vec!["hr-1", "sales-1", "doc-1"]);

        let s = &report.summary;
        assert_eq!(s.total, 3);
        assert_eq!(s.perfect + s.acceptable + s.failed, 3);
        assert_eq!(s.route_perfect, 3);
        // "ok" is too thin to pass
        assert_eq!(report.failed().next().map(|r| r.result.case_id.as_str()), Some("doc-1"));
        assert_eq!(s.per_route.len(), 3);
    }

    #[test]
    fn test_dedicated_pool() {
        let cases = corpus();
        let report = runner(2)
            .run(&cases, &KeywordRouter::default(), canned_answer)
            .unwrap();
        assert_eq!(report.records.len(), 3);
    }

    #[test]
    fn test_empty_corpus() {
        let report = runner(0)
            .run(&[], &KeywordRouter::default(), canned_answer)
            .unwrap();
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.pass_rate(), 0.0);
    }

    #[test]
    fn test_compare_strategies() {
        let cases = corpus();
        let keyword = KeywordRouter::default();
        let docs = DocsOnly;
        let strategies: [(&str, &dyn QueryRouter); 2] = [("keyword", &keyword), ("docs_only", &docs)];
        let results = compare_strategies(&cases, &strategies);

        assert_eq!(results[0].perfect, 3);
        assert_eq!(results[0].wrong, 0);

        // docs_only: wrong on hr-1, acceptable on sales-1, perfect on doc-1
        assert_eq!(results[1].perfect, 1);
        assert_eq!(results[1].acceptable, 1);
        assert_eq!(results[1].wrong, 1);
        assert!((results[1].mean_route_score - 1.7 / 3.0).abs() < 1e-9);

        let table = format_comparison(&results);
        assert!(table.contains("docs_only"));
    }

    #[test]
    fn test_format_report_lists_failures() {
        let cases = vec![TestCase::strict(
            "doc-9",
            "annual leave policy",
            Route::RagDocs,
            AnswerCriteria::default(),
        )
        .unwrap()];
        let report = runner(0)
            .run(&cases, &KeywordRouter::default(), |_, _| "no".to_string())
            .unwrap();
        let text = format_report(&report);
        assert!(text.contains("Answer Evaluation Report"));
        assert!(text.contains("Failed cases (1/1)"));
        assert!(text.contains("doc-9"));
        assert!(text.contains("rag_docs"));
    }
}
