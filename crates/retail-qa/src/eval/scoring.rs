//! Route accuracy and the two-tier verdict.
//!
//! Routing and answer quality are scored separately, then blended 0.3/0.7.
//! Quality dominates: a mis-routed query whose answer is still good passes,
//! a well-routed query with a poor answer does not.

use serde::{Deserialize, Serialize};

use crate::types::{Route, RoutingDecision};

use super::profile::profile_for_route;
use super::quality::{AnswerQualityEvaluator, QualityBreakdown};
use super::test_case::TestCase;

const ROUTE_WEIGHT: f64 = 0.3;
const QUALITY_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Wrong,
    Acceptable,
    Perfect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    Failed,
    Acceptable,
    Perfect,
}

/// 1.0 for the preferred route, 0.7 for another acceptable one, else 0.0.
pub fn score_route(actual: Route, test_case: &TestCase) -> (f64, RouteStatus) {
    if actual == test_case.preferred_route {
        (1.0, RouteStatus::Perfect)
    } else if test_case.is_acceptable(actual) {
        (0.7, RouteStatus::Acceptable)
    } else {
        (0.0, RouteStatus::Wrong)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TwoTierCombiner;

impl TwoTierCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Blend route and quality scores; thresholds follow the category of
    /// `route`, the route that actually answered.
    pub fn combine(&self, route_score: f64, quality_score: f64, route: Route) -> (f64, FinalStatus) {
        let profile = profile_for_route(route);
        let overall = (ROUTE_WEIGHT * route_score + QUALITY_WEIGHT * quality_score).clamp(0.0, 1.0);

        let status = if quality_score >= profile.excellence_threshold && route_score == 1.0 {
            FinalStatus::Perfect
        } else if quality_score >= profile.quality_threshold {
            FinalStatus::Acceptable
        } else {
            FinalStatus::Failed
        };

        (overall, status)
    }
}

/// Full verdict for one routed and answered test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub case_id: String,
    pub actual_route: Route,
    pub route_score: f64,
    pub route_status: RouteStatus,
    pub quality_score: f64,
    pub breakdown: QualityBreakdown,
    pub overall_score: f64,
    pub final_status: FinalStatus,
    pub justification: String,
}

/// Score routing and answer quality for one case and combine them.
pub fn evaluate_case(
    test_case: &TestCase,
    decision: &RoutingDecision,
    answer: &str,
    evaluator: &AnswerQualityEvaluator,
    combiner: &TwoTierCombiner,
) -> EvaluationResult {
    let (route_score, route_status) = score_route(decision.route, test_case);
    let assessment = evaluator.evaluate(&test_case.query, answer, test_case, decision.route);
    let (overall_score, final_status) =
        combiner.combine(route_score, assessment.quality_score, decision.route);

    tracing::debug!(
        case = %test_case.id,
        route = %decision.route,
        route_status = ?route_status,
        quality = assessment.quality_score,
        overall = overall_score,
        status = ?final_status,
        "[Eval] Case scored"
    );

    EvaluationResult {
        case_id: test_case.id.clone(),
        actual_route: decision.route,
        route_score,
        route_status,
        quality_score: assessment.quality_score,
        breakdown: assessment.breakdown,
        overall_score,
        final_status,
        justification: assessment.justification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationConfig;
    use crate::eval::test_case::AnswerCriteria;

    fn hr_case() -> TestCase {
        TestCase::new(
            "hr-1",
            "headcount by department",
            Route::HrKpi,
            [Route::HrKpi, Route::SalesKpi],
            AnswerCriteria::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_score_route_levels() {
        let case = hr_case();
        assert_eq!(score_route(Route::HrKpi, &case), (1.0, RouteStatus::Perfect));
        assert_eq!(score_route(Route::SalesKpi, &case), (0.7, RouteStatus::Acceptable));
        assert_eq!(score_route(Route::RagDocs, &case), (0.0, RouteStatus::Wrong));
    }

    #[test]
    fn test_quality_rescues_wrong_route() {
        // hr_kpi preferred, rag_docs answered well
        let (overall, status) = TwoTierCombiner::new().combine(0.0, 0.82, Route::RagDocs);
        assert!((overall - 0.574).abs() < 1e-9);
        assert_eq!(status, FinalStatus::Acceptable);
    }

    #[test]
    fn test_perfect_needs_perfect_route() {
        let combiner = TwoTierCombiner::new();
        assert_eq!(combiner.combine(1.0, 0.80, Route::RagDocs).1, FinalStatus::Perfect);
        assert_eq!(combiner.combine(0.7, 0.95, Route::RagDocs).1, FinalStatus::Acceptable);
        assert_eq!(combiner.combine(1.0, 0.79, Route::RagDocs).1, FinalStatus::Acceptable);
    }

    #[test]
    fn test_kpi_thresholds_are_lower() {
        let combiner = TwoTierCombiner::new();
        assert_eq!(combiner.combine(1.0, 0.75, Route::SalesKpi).1, FinalStatus::Perfect);
        assert_eq!(combiner.combine(1.0, 0.65, Route::SalesKpi).1, FinalStatus::Acceptable);
        assert_eq!(combiner.combine(1.0, 0.65, Route::RagDocs).1, FinalStatus::Failed);
        assert_eq!(combiner.combine(1.0, 0.62, Route::HrKpi).1, FinalStatus::Failed);
    }

    #[test]
    fn test_overall_is_monotonic() {
        let combiner = TwoTierCombiner::new();
        for route in Route::ALL {
            for route_score in [0.0, 0.7, 1.0] {
                let mut previous = f64::MIN;
                for step in 0..=20 {
                    let quality = step as f64 / 20.0;
                    let (overall, _) = combiner.combine(route_score, quality, route);
                    assert!(overall >= previous);
                    previous = overall;
                }
            }
            for step in 0..=20 {
                let quality = step as f64 / 20.0;
                let low = combiner.combine(0.0, quality, route).0;
                let mid = combiner.combine(0.7, quality, route).0;
                let high = combiner.combine(1.0, quality, route).0;
                assert!(low <= mid && mid <= high);
            }
        }
    }

    #[test]
    fn test_evaluate_case_end_to_end() {
        let case = hr_case();
        let decision = RoutingDecision::new(Route::HrKpi, "headcount by department", 0.95, "kw");
        let answer = "Headcount by department:\n- Sales 120 staff\n- Operations 85 staff\n\
                      Total headcount is 205, up from 190 last quarter, above the 200 target.";
        let result = evaluate_case(
            &case,
            &decision,
            answer,
            &AnswerQualityEvaluator::new(EvaluationConfig::default()),
            &TwoTierCombiner::new(),
        );
        assert_eq!(result.case_id, "hr-1");
        assert_eq!(result.route_status, RouteStatus::Perfect);
        assert!(result.breakdown.executive_format.is_some());
        assert!((result.overall_score - (0.3 + 0.7 * result.quality_score)).abs() < 1e-9);
        assert_ne!(result.final_status, FinalStatus::Failed);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(serde_json::to_string(&FinalStatus::Perfect).unwrap(), "\"PERFECT\"");
        assert_eq!(serde_json::to_string(&RouteStatus::Wrong).unwrap(), "\"WRONG\"");
    }
}
