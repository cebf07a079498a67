//! Query routing: normalization, keyword and fuzzy matching, time and data
//! availability checks, and the interchangeable routing strategies.

pub mod availability;
pub mod clarification;
pub mod fuzzy;
pub mod hybrid;
pub mod keywords;
pub mod llm;
pub mod router;
pub mod semantic;
pub mod time_sensitivity;

pub use availability::{parse_period, AvailabilityResult, DataAvailabilityValidator, YearMonth};
pub use clarification::{clarification_for, ClarificationPrompt, QueryPlan, QueryPlanner};
pub use fuzzy::{contains_fuzzy_keyword, fuzzy_keyword_hits, fuzzy_match, normalize};
pub use hybrid::HybridRouter;
pub use keywords::{match_keywords, KeywordMatch, KeywordSet};
pub use llm::{LlmRouter, TextGenerator};
pub use router::{build_router, DomainHits, KeywordRouter, QueryRouter};
pub use semantic::SemanticRouter;
pub use time_sensitivity::{
    extract_timeframe, is_metadata_count, TimeClass, TimeClassification, TimeSensitivityClassifier,
};
