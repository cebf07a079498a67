//! Query Routing
//!
//! Every strategy implements [`QueryRouter`] so evaluation can swap them
//! freely. [`KeywordRouter`] is the reference policy; the semantic, LLM and
//! hybrid strategies live in sibling modules.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{RouterConfig, RouterStrategy};
use crate::embeddings::EmbeddingModel;
use crate::error::QaError;
use crate::types::{Query, Route, RoutingDecision};

use super::fuzzy::{fuzzy_keyword_hits, normalize};
use super::hybrid::HybridRouter;
use super::keywords::{AMBIGUOUS_DOMAIN_WORDS, HR_KEYWORDS, POLICY_KEYWORDS, SALES_KEYWORDS};
use super::llm::{LlmRouter, TextGenerator};
use super::semantic::SemanticRouter;

/// Follow-up openers that carry the previous topic forward.
const FOLLOW_UP_OPENERS: &[&str] = &["what about", "how about", "and for", "and in", "bagaimana pula"];
const FOLLOW_UP_MAX_TOKENS: usize = 6;
const FOLLOW_UP_CONFIDENCE: f32 = 0.65;

/// Chooses the handler for a query. Implementations hold no per-request
/// state and must always return a decision.
pub trait QueryRouter: Send + Sync {
    fn route(&self, query: &Query) -> RoutingDecision;

    /// Short identifier used in logs and A/B reports.
    fn name(&self) -> &'static str;
}

pub(crate) fn image_decision(normalized: &str) -> RoutingDecision {
    RoutingDecision::new(Route::Visual, normalized, 1.0, "image attached")
}

pub(crate) fn default_decision(normalized: &str, confidence: f32) -> RoutingDecision {
    RoutingDecision::new(Route::RagDocs, normalized, confidence, "no keywords matched")
}

// ============================================================================
// Keyword strategy
// ============================================================================

/// Keyword hits per domain for one query.
#[derive(Debug, Clone, Default)]
pub struct DomainHits {
    pub hr: BTreeSet<String>,
    pub sales: BTreeSet<String>,
    pub policy: BTreeSet<String>,
}

pub struct KeywordRouter {
    config: RouterConfig,
}

impl KeywordRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Fuzzy keyword hits for each domain, using the configured thresholds.
    pub fn domain_hits(&self, normalized: &str) -> DomainHits {
        DomainHits {
            hr: fuzzy_keyword_hits(normalized, HR_KEYWORDS, self.config.domain_fuzzy_threshold),
            sales: fuzzy_keyword_hits(
                normalized,
                SALES_KEYWORDS,
                self.config.domain_fuzzy_threshold,
            ),
            policy: fuzzy_keyword_hits(
                normalized,
                POLICY_KEYWORDS,
                self.config.policy_fuzzy_threshold,
            ),
        }
    }

    /// The single ambiguous domain word of a one- or two-token query.
    fn ambiguous_guess(normalized: &str) -> Option<(&'static str, Route)> {
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > 2 {
            return None;
        }
        let found: Vec<(&'static str, Route)> = AMBIGUOUS_DOMAIN_WORDS
            .iter()
            .filter(|(word, _)| tokens.contains(word))
            .copied()
            .collect();
        match found.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    fn follow_up_route(&self, query: &Query, normalized: &str) -> Option<Route> {
        if query.history.is_empty() || normalized.split_whitespace().count() > FOLLOW_UP_MAX_TOKENS {
            return None;
        }
        if !FOLLOW_UP_OPENERS.iter().any(|o| normalized.starts_with(o)) {
            return None;
        }
        query.last_route().filter(|r| r.is_kpi())
    }

    /// Route and also return the hits that backed the decision.
    pub fn route_with_hits(&self, query: &Query) -> (RoutingDecision, usize) {
        let normalized = normalize(&query.text);

        if query.has_image {
            return (image_decision(&normalized), 0);
        }

        if let Some((word, route)) = Self::ambiguous_guess(&normalized) {
            let decision = RoutingDecision::new(
                route,
                &normalized,
                self.config.ambiguous_confidence,
                format!("short ambiguous query, best guess from '{}'", word),
            );
            return (decision, 1);
        }

        let hits = self.domain_hits(&normalized);
        let ranked = [
            (Route::HrKpi, &hits.hr, self.config.keyword_confidence, "HR"),
            (Route::SalesKpi, &hits.sales, self.config.keyword_confidence, "sales"),
            (Route::RagDocs, &hits.policy, self.config.policy_confidence, "policy"),
        ];
        for (route, matched, confidence, label) in ranked {
            if !matched.is_empty() {
                let words: Vec<&str> = matched.iter().map(String::as_str).collect();
                let decision = RoutingDecision::new(
                    route,
                    &normalized,
                    confidence,
                    format!("matched {} keywords: {}", label, words.join(", ")),
                );
                return (decision, matched.len());
            }
        }

        if let Some(route) = self.follow_up_route(query, &normalized) {
            let decision = RoutingDecision::new(
                route,
                &normalized,
                FOLLOW_UP_CONFIDENCE,
                "follow-up to previous question",
            );
            return (decision, 0);
        }

        (default_decision(&normalized, self.config.default_confidence), 0)
    }
}

impl Default for KeywordRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl QueryRouter for KeywordRouter {
    fn route(&self, query: &Query) -> RoutingDecision {
        let (decision, hits) = self.route_with_hits(query);
        tracing::debug!(
            route = %decision.route,
            confidence = decision.confidence,
            hits,
            reason = %decision.reason,
            "[KeywordRouter] Routed"
        );
        decision
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

// ============================================================================
// Strategy factory
// ============================================================================

/// Build the strategy named in `config`. Strategies that need a collaborator
/// fail with `QaError::Config` when it is not supplied.
pub fn build_router(
    config: &RouterConfig,
    embedder: Option<Arc<dyn EmbeddingModel>>,
    generator: Option<Arc<dyn TextGenerator>>,
) -> Result<Box<dyn QueryRouter>, QaError> {
    let missing = |what: &str| {
        QaError::Config(format!(
            "router strategy {:?} requires {}",
            config.strategy, what
        ))
    };

    let router: Box<dyn QueryRouter> = match config.strategy {
        RouterStrategy::Keyword => Box::new(KeywordRouter::new(config.clone())),
        RouterStrategy::Semantic => {
            let embedder = embedder.ok_or_else(|| missing("an embedding model"))?;
            Box::new(SemanticRouter::with_default_examples(embedder, config.clone())?)
        }
        RouterStrategy::Llm => {
            let generator = generator.ok_or_else(|| missing("a text generator"))?;
            Box::new(LlmRouter::new(generator, config.clone()))
        }
        RouterStrategy::Hybrid => {
            let embedder = embedder.ok_or_else(|| missing("an embedding model"))?;
            let semantic = SemanticRouter::with_default_examples(embedder, config.clone())?;
            Box::new(HybridRouter::new(KeywordRouter::new(config.clone()), semantic))
        }
    };

    tracing::info!(strategy = router.name(), "[Router] Strategy selected");
    Ok(router)
}
