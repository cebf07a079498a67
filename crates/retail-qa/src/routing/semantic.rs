//! Embedding-centroid routing.
//!
//! Each domain is represented by the centroid of a handful of example
//! questions, embedded once at construction. A query goes to the domain whose
//! centroid is most cosine-similar.

use std::sync::Arc;

use crate::config::RouterConfig;
use crate::embeddings::{centroid, cosine_similarity, EmbeddingModel};
use crate::error::QaError;
use crate::types::{Query, Route, RoutingDecision};

use super::fuzzy::normalize;
use super::router::{default_decision, image_decision, QueryRouter};

const HR_EXAMPLES: &[&str] = &[
    "what is our total headcount",
    "show employee attrition by department",
    "how many staff resigned",
    "average salary per department",
    "age and gender distribution of employees",
    "overtime hours by branch staff",
];

const SALES_EXAMPLES: &[&str] = &[
    "total sales revenue by state",
    "top selling products this month",
    "compare branch sales performance",
    "average basket size per transaction",
    "which state has the highest revenue",
    "sales trend by product category",
];

const POLICY_EXAMPLES: &[&str] = &[
    "what is the annual leave policy",
    "how do I submit a medical claim",
    "refund and return procedure for customers",
    "staff dress code guideline",
    "code of conduct in the employee handbook",
    "standard operating procedure for store opening",
];

struct DomainCentroid {
    route: Route,
    vector: Vec<f32>,
}

pub struct SemanticRouter {
    embedder: Arc<dyn EmbeddingModel>,
    centroids: Vec<DomainCentroid>,
    config: RouterConfig,
}

impl SemanticRouter {
    /// Embed `examples` per route and keep their centroids.
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        examples: &[(Route, &[&str])],
        config: RouterConfig,
    ) -> Result<Self, QaError> {
        let mut centroids = Vec::with_capacity(examples.len());
        for (route, texts) in examples {
            let vectors = embedder
                .encode_batch(texts)
                .map_err(|e| QaError::Embedding(format!("{} examples: {}", route, e)))?;
            let vector = centroid(&vectors).ok_or_else(|| {
                QaError::Config(format!("route {} needs at least one example", route))
            })?;
            centroids.push(DomainCentroid {
                route: *route,
                vector,
            });
        }

        tracing::debug!(domains = centroids.len(), "[SemanticRouter] Centroids built");
        Ok(Self {
            embedder,
            centroids,
            config,
        })
    }

    pub fn with_default_examples(
        embedder: Arc<dyn EmbeddingModel>,
        config: RouterConfig,
    ) -> Result<Self, QaError> {
        Self::new(
            embedder,
            &[
                (Route::HrKpi, HR_EXAMPLES),
                (Route::SalesKpi, SALES_EXAMPLES),
                (Route::RagDocs, POLICY_EXAMPLES),
            ],
            config,
        )
    }

    /// Most similar domain and its cosine, or `None` if the query cannot be
    /// embedded.
    pub fn best_match(&self, normalized: &str) -> Option<(Route, f32)> {
        let embedding = match self.embedder.encode(normalized) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "[SemanticRouter] Query embedding failed");
                return None;
            }
        };

        self.centroids
            .iter()
            .map(|c| (c.route, cosine_similarity(&embedding, &c.vector)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn min_similarity(&self) -> f32 {
        self.config.min_semantic_similarity
    }

    pub(crate) fn decide(&self, normalized: &str) -> RoutingDecision {
        self.decide_from(normalized, self.best_match(normalized))
    }

    /// Decision for an already computed `best_match` result.
    pub(crate) fn decide_from(
        &self,
        normalized: &str,
        best: Option<(Route, f32)>,
    ) -> RoutingDecision {
        match best {
            Some((route, similarity)) if similarity >= self.config.min_semantic_similarity => {
                RoutingDecision::new(
                    route,
                    normalized,
                    similarity,
                    format!("closest to {} examples (cosine {:.2})", route, similarity),
                )
            }
            Some((_, similarity)) => RoutingDecision::new(
                Route::RagDocs,
                normalized,
                self.config.default_confidence,
                format!("no domain similar enough (best cosine {:.2})", similarity),
            ),
            None => default_decision(normalized, self.config.default_confidence),
        }
    }
}

impl QueryRouter for SemanticRouter {
    fn route(&self, query: &Query) -> RoutingDecision {
        let normalized = normalize(&query.text);
        if query.has_image {
            return image_decision(&normalized);
        }

        let decision = self.decide(&normalized);
        tracing::debug!(
            route = %decision.route,
            confidence = decision.confidence,
            reason = %decision.reason,
            "[SemanticRouter] Routed"
        );
        decision
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;

    struct FailingEmbedder;

    impl EmbeddingModel for FailingEmbedder {
        fn encode(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("model not loaded")
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn router() -> SemanticRouter {
        SemanticRouter::with_default_examples(
            Arc::new(HashingEmbedder::default()),
            RouterConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_routes_close_paraphrases() {
        let r = router();
        assert_eq!(r.route(&Query::new("employee attrition by department")).route, Route::HrKpi);
        assert_eq!(r.route(&Query::new("top selling products by state")).route, Route::SalesKpi);
        assert_eq!(r.route(&Query::new("annual leave policy")).route, Route::RagDocs);
    }

    #[test]
    fn test_unrelated_query_defaults() {
        let d = router().route(&Query::new("zzz qqq"));
        assert_eq!(d.route, Route::RagDocs);
        assert_eq!(d.confidence, 0.5);
    }

    #[test]
    fn test_image_wins() {
        let d = router().route(&Query::new("total sales").with_image(true));
        assert_eq!(d.route, Route::Visual);
    }

    #[test]
    fn test_construction_surfaces_embedding_failure() {
        let result =
            SemanticRouter::with_default_examples(Arc::new(FailingEmbedder), RouterConfig::default());
        assert!(matches!(result, Err(QaError::Embedding(_))));
    }

    #[test]
    fn test_empty_example_set_is_rejected() {
        let result = SemanticRouter::new(
            Arc::new(HashingEmbedder::default()),
            &[(Route::HrKpi, &[])],
            RouterConfig::default(),
        );
        assert!(matches!(result, Err(QaError::Config(_))));
    }
}
