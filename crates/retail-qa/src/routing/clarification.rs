//! Clarification and pre-handler planning.
//!
//! Low-confidence decisions on very short queries get a list of concrete
//! reformulations instead of a guess. [`QueryPlanner`] runs the router, then
//! the time and availability checks that KPI handlers need before they can
//! answer.

use serde::{Deserialize, Serialize};

use crate::config::RouterConfig;
use crate::types::{Query, Route, RoutingDecision};

use super::availability::{parse_period, AvailabilityResult, DataAvailabilityValidator};
use super::router::QueryRouter;
use super::time_sensitivity::{TimeClassification, TimeSensitivityClassifier};

const CLARIFY_MAX_TOKENS: usize = 2;

const HR_REFORMULATIONS: &[&str] = &[
    "What is the total headcount by department?",
    "How many staff resigned last month?",
    "What is the attrition rate this year?",
    "Show the average salary by department",
];

const SALES_REFORMULATIONS: &[&str] = &[
    "What were total sales last month?",
    "Which state had the highest revenue this year?",
    "Show the top 5 products by revenue",
    "Compare sales across branches for this month",
];

const POLICY_REFORMULATIONS: &[&str] = &[
    "What is the annual leave policy?",
    "How do I submit a medical claim?",
    "What is the refund procedure for customers?",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationPrompt {
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ClarificationPrompt {
    /// Message followed by one numbered suggestion per line.
    pub fn render(&self) -> String {
        let mut out = self.message.clone();
        for (i, s) in self.suggestions.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, s));
        }
        out
    }
}

/// Reformulations for a short, low-confidence decision; `None` when the
/// decision is confident or the query is long enough to stand on its own.
pub fn clarification_for(
    decision: &RoutingDecision,
    query: &Query,
    config: &RouterConfig,
) -> Option<ClarificationPrompt> {
    if decision.confidence >= config.clarification_confidence
        || query.token_count() > CLARIFY_MAX_TOKENS
    {
        return None;
    }

    let suggestions = match decision.route {
        Route::HrKpi => HR_REFORMULATIONS,
        Route::SalesKpi => SALES_REFORMULATIONS,
        Route::RagDocs => POLICY_REFORMULATIONS,
        Route::Visual => return None,
    };

    Some(ClarificationPrompt {
        message: format!(
            "\"{}\" could mean several things. Did you mean one of these?",
            query.text.trim()
        ),
        suggestions: suggestions.iter().map(|s| (*s).to_string()).collect(),
    })
}

// ============================================================================
// Planner
// ============================================================================

/// Everything decided before a handler runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub decision: RoutingDecision,
    /// Present for KPI routes only
    pub time: Option<TimeClassification>,
    /// Present when a KPI query names a concrete month and a validator is set
    pub availability: Option<AvailabilityResult>,
    /// Question to put back to the user instead of answering
    pub clarification: Option<String>,
}

pub struct QueryPlanner {
    router: Box<dyn QueryRouter>,
    classifier: TimeSensitivityClassifier,
    validator: Option<DataAvailabilityValidator>,
    config: RouterConfig,
}

impl QueryPlanner {
    pub fn new(router: Box<dyn QueryRouter>, config: RouterConfig) -> Self {
        Self {
            router,
            classifier: TimeSensitivityClassifier::new(),
            validator: None,
            config,
        }
    }

    pub fn with_validator(mut self, validator: DataAvailabilityValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn plan(&self, query: &Query) -> QueryPlan {
        let decision = self.router.route(query);

        if let Some(prompt) = clarification_for(&decision, query, &self.config) {
            tracing::debug!(route = %decision.route, "[Planner] Short ambiguous query");
            return QueryPlan {
                decision,
                time: None,
                availability: None,
                clarification: Some(prompt.render()),
            };
        }

        if !decision.route.is_kpi() {
            return QueryPlan {
                decision,
                time: None,
                availability: None,
                clarification: None,
            };
        }

        let time = self.classifier.classify(&query.text);
        if time.needs_clarification {
            let clarification = self.period_question();
            return QueryPlan {
                decision,
                time: Some(time),
                availability: None,
                clarification: Some(clarification),
            };
        }

        let availability = match (&self.validator, &time.explicit_timeframe) {
            (Some(validator), Some(timeframe)) => {
                requested_period(&decision.normalized_query, timeframe)
                    .map(|period| validator.validate(Some(&period)))
            }
            _ => None,
        };

        let clarification = availability
            .as_ref()
            .filter(|a| !a.available)
            .map(|a| {
                if a.suggestion.is_empty() {
                    a.message.clone()
                } else {
                    format!("{} {}", a.message, a.suggestion)
                }
            });

        if clarification.is_some() {
            tracing::debug!(
                timeframe = ?time.explicit_timeframe,
                "[Planner] Requested period has no data"
            );
        }

        QueryPlan {
            decision,
            time: Some(time),
            availability,
            clarification,
        }
    }

    fn period_question(&self) -> String {
        let latest = self
            .validator
            .as_ref()
            .and_then(|v| v.periods().last())
            .map(|p| format!(" The latest month with data is {}.", p))
            .unwrap_or_default();
        format!(
            "Which period should I use? For example this month, last month, or a specific month such as 2024-06.{}",
            latest
        )
    }
}

/// A concrete month named around `timeframe`, trying "june 2024" before
/// "june". Relative windows and quarters yield `None`.
fn requested_period(normalized: &str, timeframe: &str) -> Option<String> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let width = timeframe.split_whitespace().count().max(1);
    let start = tokens
        .windows(width)
        .position(|w| w.join(" ") == timeframe)?;

    if let Some(next) = tokens.get(start + width) {
        let extended = format!("{} {}", timeframe, next);
        if parse_period(&extended).is_some() {
            return Some(extended);
        }
    }
    parse_period(timeframe).map(|_| timeframe.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::availability::YearMonth;
    use crate::routing::router::KeywordRouter;

    fn planner() -> QueryPlanner {
        let validator =
            DataAvailabilityValidator::from_periods((1..=6).filter_map(|m| YearMonth::new(2024, m)));
        QueryPlanner::new(Box::new(KeywordRouter::default()), RouterConfig::default())
            .with_validator(validator)
    }

    #[test]
    fn test_short_ambiguous_query_gets_reformulations() {
        let config = RouterConfig::default();
        let query = Query::new("sales");
        let decision = KeywordRouter::default().route(&query);
        let prompt = clarification_for(&decision, &query, &config).unwrap();
        assert!((3..=5).contains(&prompt.suggestions.len()));
        assert!(prompt.suggestions.iter().any(|s| s.contains("sales")));
        assert!(prompt.message.contains("\"sales\""));
    }

    #[test]
    fn test_confident_or_long_queries_need_no_clarification() {
        let config = RouterConfig::default();
        let query = Query::new("headcount");
        let decision = KeywordRouter::default().route(&query);
        assert!(clarification_for(&decision, &query, &config).is_none());

        let query = Query::new("good morning to you all");
        let decision = KeywordRouter::default().route(&query);
        assert!(decision.confidence < 0.7);
        assert!(clarification_for(&decision, &query, &config).is_none());
    }

    #[test]
    fn test_plan_asks_for_missing_period() {
        let plan = planner().plan(&Query::new("total revenue by branch"));
        assert_eq!(plan.decision.route, Route::SalesKpi);
        let question = plan.clarification.unwrap();
        assert!(question.contains("Which period"));
        assert!(question.contains("2024-06"));
    }

    #[test]
    fn test_plan_flags_unavailable_month() {
        let plan = planner().plan(&Query::new("sales for 2023-12"));
        let availability = plan.availability.unwrap();
        assert!(!availability.available);
        assert_eq!(availability.alternatives[0], "2024-01");
        assert!(plan.clarification.unwrap().contains("2024-01"));
    }

    #[test]
    fn test_plan_accepts_available_month() {
        let plan = planner().plan(&Query::new("sales in march 2024"));
        assert!(plan.availability.unwrap().available);
        assert!(plan.clarification.is_none());
    }

    #[test]
    fn test_plan_skips_time_checks_for_documents() {
        let plan = planner().plan(&Query::new("what is the annual leave policy"));
        assert_eq!(plan.decision.route, Route::RagDocs);
        assert!(plan.time.is_none());
        assert!(plan.clarification.is_none());
    }

    #[test]
    fn test_requested_period_extends_month_name() {
        assert_eq!(
            requested_period("sales in june 2024", "june").as_deref(),
            Some("june 2024")
        );
        assert_eq!(requested_period("sales last month", "last month"), None);
        assert_eq!(
            requested_period("revenue 2024-05", "2024-05").as_deref(),
            Some("2024-05")
        );
    }
}
