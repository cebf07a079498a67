//! Keyword-first routing with an embedding fallback.
//!
//! Keywords decide when they are backed by enough distinct hits. Thin keyword
//! evidence is handed to the semantic router, unless the semantic match is
//! itself too weak, in which case the keyword decision stands.

use crate::types::{Query, Route, RoutingDecision};

use super::router::{KeywordRouter, QueryRouter};
use super::semantic::SemanticRouter;

pub struct HybridRouter {
    keyword: KeywordRouter,
    semantic: SemanticRouter,
}

impl HybridRouter {
    pub fn new(keyword: KeywordRouter, semantic: SemanticRouter) -> Self {
        Self { keyword, semantic }
    }
}

impl QueryRouter for HybridRouter {
    fn route(&self, query: &Query) -> RoutingDecision {
        let (keyword_decision, hits) = self.keyword.route_with_hits(query);
        if keyword_decision.route == Route::Visual
            || hits >= self.keyword.config().min_keyword_hits
        {
            tracing::debug!(
                route = %keyword_decision.route,
                hits,
                "[HybridRouter] Keyword decision kept"
            );
            return keyword_decision;
        }

        let normalized = &keyword_decision.normalized_query;
        match self.semantic.best_match(normalized) {
            Some((route, similarity)) if similarity >= self.semantic.min_similarity() => {
                let decision = self.semantic.decide_from(normalized, Some((route, similarity)));
                tracing::debug!(
                    keyword_route = %keyword_decision.route,
                    semantic_route = %decision.route,
                    hits,
                    similarity,
                    "[HybridRouter] Semantic decision used"
                );
                decision
            }
            _ => {
                tracing::debug!(
                    route = %keyword_decision.route,
                    hits,
                    "[HybridRouter] Semantic match too weak, keeping keywords"
                );
                keyword_decision
            }
        }
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
