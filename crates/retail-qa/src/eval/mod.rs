//! Offline evaluation: route accuracy, answer quality, and the combined
//! two-tier verdict over a labeled corpus.

pub mod profile;
pub mod quality;
pub mod scoring;
pub mod suite;
pub mod test_case;

pub use profile::{profile_for, profile_for_route, DimensionWeights, ScoringProfile};
pub use quality::{extract_numbers, AnswerQualityEvaluator, QualityAssessment, QualityBreakdown};
pub use scoring::{
    evaluate_case, score_route, EvaluationResult, FinalStatus, RouteStatus, TwoTierCombiner,
};
pub use suite::{
    compare_strategies, format_comparison, format_report, CaseRecord, StrategyComparison,
    SuiteReport, SuiteRunner, SuiteSummary,
};
pub use test_case::{load_test_cases, parse_test_cases, AnswerCriteria, TestCase};
