//! Query routing and two-tier answer evaluation for a retail analytics assistant.
//!
//! A question is routed to one of four handlers (visual, HR KPIs, sales KPIs,
//! document retrieval). Offline, the produced answer is graded on routing
//! correctness and answer quality and folded into one verdict.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod routing;
pub mod types;

// Re-export primary types for convenience
pub use config::{AssistantConfig, EmbeddingConfig, EvaluationConfig, RouterConfig, RouterStrategy};
pub use embeddings::{CachedEmbedder, EmbeddingModel, HashingEmbedder};
pub use error::QaError;
pub use eval::{
    AnswerCriteria, AnswerQualityEvaluator, EvaluationResult, FinalStatus, QualityBreakdown,
    RouteStatus, SuiteReport, SuiteRunner, TestCase, TwoTierCombiner,
};
pub use routing::{
    build_router, AvailabilityResult, DataAvailabilityValidator, HybridRouter, KeywordRouter,
    LlmRouter, QueryPlan, QueryPlanner, QueryRouter, SemanticRouter, TextGenerator,
    TimeClassification, TimeSensitivityClassifier,
};
pub use types::{Exchange, Query, Route, RouteCategory, RoutingDecision};

pub use anyhow::Result;
