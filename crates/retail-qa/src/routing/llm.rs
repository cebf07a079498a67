//! LLM-Based Route Classification
//!
//! One short generation call picks a single route label. The generator is an
//! injected collaborator; when it fails or answers with something that is not
//! a label, the keyword policy decides instead so routing always completes.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

use crate::config::RouterConfig;
use crate::types::{Query, Route, RoutingDecision};

use super::fuzzy::normalize;
use super::router::{image_decision, KeywordRouter, QueryRouter};

/// Text generation backend (local model, hosted API, test script).
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String>;
}

const STRICT_CONFIDENCE: f32 = 0.85;
const LENIENT_CONFIDENCE: f32 = 0.7;
const HISTORY_TURNS: usize = 4;

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

const ROUTER_SYSTEM_PROMPT: &str = r#"You route questions for a retail chain assistant. Output a JSON object with exactly these fields:

{"route":"hr_kpi|sales_kpi|rag_docs","reasoning":"..."}

RULES:
- "hr_kpi": workforce numbers: headcount, attrition, salaries, departments, staff demographics, overtime.
- "sales_kpi": sales numbers: revenue, transactions, products, branches, states, top sellers, trends.
- "rag_docs": policies, SOPs, procedures, handbooks, leave and claims, and anything else.
- Questions may mix Malay and English and contain typos.
- reasoning: one sentence.

Output ONLY the JSON object, nothing else."#;

fn build_router_prompt(normalized: &str, query: &Query) -> String {
    let mut parts = Vec::with_capacity(3);
    parts.push(ROUTER_SYSTEM_PROMPT.to_string());

    if !query.history.is_empty() {
        let start = query.history.len().saturating_sub(HISTORY_TURNS);
        let history = query.history[start..]
            .iter()
            .map(|e| format!("user: {}\nassistant: {}", e.query, e.answer))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\nConversation:\n{}", history));
    }

    parts.push(format!("\nUser message: \"{}\"\nJSON:", normalized));
    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LlmRouteResponse {
    route: String,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, PartialEq)]
struct ParsedRoute {
    route: Route,
    reasoning: String,
    strict: bool,
}

/// Strict JSON first, then the earliest route label anywhere in the text.
fn parse_route_response(raw: &str) -> Option<ParsedRoute> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    };

    if let Ok(parsed) = serde_json::from_str::<LlmRouteResponse>(json_str) {
        if let Ok(route) = parsed.route.parse::<Route>() {
            if route != Route::Visual {
                return Some(ParsedRoute {
                    route,
                    reasoning: parsed.reasoning,
                    strict: true,
                });
            }
        }
    }

    let lower = cleaned.to_lowercase();
    [Route::HrKpi, Route::SalesKpi, Route::RagDocs]
        .into_iter()
        .filter_map(|route| lower.find(route.as_str()).map(|pos| (pos, route)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, route)| ParsedRoute {
            route,
            reasoning: "LLM router (partial parse)".to_string(),
            strict: false,
        })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct LlmRouter {
    generator: Arc<dyn TextGenerator>,
    fallback: KeywordRouter,
    max_tokens: usize,
}

impl LlmRouter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: RouterConfig) -> Self {
        Self {
            generator,
            max_tokens: config.llm_max_tokens,
            fallback: KeywordRouter::new(config),
        }
    }

    fn fall_back(&self, query: &Query, why: &str) -> RoutingDecision {
        let mut decision = self.fallback.route(query);
        decision.reason = format!("{}; keyword fallback: {}", why, decision.reason);
        decision
    }
}

impl QueryRouter for LlmRouter {
    fn route(&self, query: &Query) -> RoutingDecision {
        let normalized = normalize(&query.text);
        if query.has_image {
            return image_decision(&normalized);
        }

        let prompt = build_router_prompt(&normalized, query);
        let start = std::time::Instant::now();
        let raw = match self.generator.generate(&prompt, self.max_tokens) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "[LlmRouter] Generation failed");
                return self.fall_back(query, "LLM unavailable");
            }
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        let Some(parsed) = parse_route_response(&raw) else {
            tracing::warn!(response = %raw, "[LlmRouter] No route label in response");
            return self.fall_back(query, "LLM answer unparseable");
        };

        let confidence = if parsed.strict {
            STRICT_CONFIDENCE
        } else {
            LENIENT_CONFIDENCE
        };
        tracing::info!(
            route = %parsed.route,
            reasoning = %parsed.reasoning,
            strict = parsed.strict,
            latency_ms,
            "[LlmRouter] LLM router decision"
        );
        RoutingDecision::new(parsed.route, normalized, confidence, parsed.reasoning)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
