//! Labeled test cases for offline evaluation.
//!
//! A test case names the route that should handle a query, the other routes
//! that would still be acceptable, and typed criteria the answer is graded
//! against. Cases are validated on construction; a corpus with one bad
//! record fails as a whole, naming the offending id.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::QaError;
use crate::types::Route;

/// Grading criteria for one answer. Absent keys take neutral defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerCriteria {
    /// Every string must appear
    pub must_contain: Vec<String>,
    /// At least one string must appear
    pub must_contain_any: Vec<String>,
    /// Bonus strings
    pub acceptable_if_includes: Vec<String>,
    /// Forbidden or hallucinated content
    pub must_not_contain: Vec<String>,
    /// Inclusive `(min, max)` for numbers quoted in the answer
    pub numerical_range: Option<(f64, f64)>,
    /// Overrides the non-KPI semantic threshold
    pub min_semantic_similarity: Option<f64>,
    pub clarification_expected: bool,
    pub out_of_scope: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TestCaseRecord")]
pub struct TestCase {
    pub id: String,
    pub query: String,
    pub preferred_route: Route,
    /// Always contains `preferred_route`
    pub acceptable_routes: BTreeSet<Route>,
    #[serde(rename = "answer_criteria")]
    pub criteria: AnswerCriteria,
}

/// Wire shape of a test case before validation.
#[derive(Debug, Deserialize)]
struct TestCaseRecord {
    id: String,
    query: String,
    preferred_route: Option<Route>,
    #[serde(default)]
    acceptable_routes: Vec<Route>,
    #[serde(default, alias = "criteria")]
    answer_criteria: AnswerCriteria,
}

impl TestCase {
    /// Validated construction. An empty `acceptable_routes` means only the
    /// preferred route is acceptable.
    pub fn new(
        id: impl Into<String>,
        query: impl Into<String>,
        preferred_route: Route,
        acceptable_routes: impl IntoIterator<Item = Route>,
        criteria: AnswerCriteria,
    ) -> Result<Self, QaError> {
        let id = id.into();
        let query = query.into();

        if id.trim().is_empty() {
            return Err(QaError::invalid_case("<unnamed>", "id is empty"));
        }
        if query.trim().is_empty() {
            return Err(QaError::invalid_case(&id, "query is empty"));
        }

        let mut acceptable: BTreeSet<Route> = acceptable_routes.into_iter().collect();
        if acceptable.is_empty() {
            acceptable.insert(preferred_route);
        } else if !acceptable.contains(&preferred_route) {
            return Err(QaError::invalid_case(
                &id,
                format!(
                    "acceptable_routes must include preferred_route '{}'",
                    preferred_route
                ),
            ));
        }

        validate_criteria(&id, &criteria)?;

        Ok(Self {
            id,
            query,
            preferred_route,
            acceptable_routes: acceptable,
            criteria,
        })
    }

    /// Convenience for cases that accept only the preferred route.
    pub fn strict(
        id: impl Into<String>,
        query: impl Into<String>,
        preferred_route: Route,
        criteria: AnswerCriteria,
    ) -> Result<Self, QaError> {
        Self::new(id, query, preferred_route, [preferred_route], criteria)
    }

    pub fn is_acceptable(&self, route: Route) -> bool {
        self.acceptable_routes.contains(&route)
    }
}

fn validate_criteria(id: &str, criteria: &AnswerCriteria) -> Result<(), QaError> {
    if let Some((min, max)) = criteria.numerical_range {
        if !min.is_finite() || !max.is_finite() {
            return Err(QaError::invalid_case(id, "numerical_range must be finite"));
        }
        if min > max {
            return Err(QaError::invalid_case(
                id,
                format!("numerical_range min {} exceeds max {}", min, max),
            ));
        }
    }
    if let Some(threshold) = criteria.min_semantic_similarity {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(QaError::invalid_case(
                id,
                "min_semantic_similarity must be in [0.0, 1.0]",
            ));
        }
    }
    Ok(())
}

impl TryFrom<TestCaseRecord> for TestCase {
    type Error = QaError;

    fn try_from(record: TestCaseRecord) -> Result<Self, Self::Error> {
        let preferred = record
            .preferred_route
            .ok_or_else(|| QaError::invalid_case(&record.id, "missing preferred_route"))?;
        Self::new(
            record.id,
            record.query,
            preferred,
            record.acceptable_routes,
            record.answer_criteria,
        )
    }
}

// ============================================================================
// Corpus loading
// ============================================================================

/// Parse a JSON array of test cases. Ids must be unique.
pub fn parse_test_cases(json: &str) -> Result<Vec<TestCase>, QaError> {
    let records: Vec<TestCaseRecord> = serde_json::from_str(json)?;
    let mut seen = HashSet::with_capacity(records.len());
    let mut cases = Vec::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.id.clone()) {
            return Err(QaError::invalid_case(&record.id, "duplicate id"));
        }
        cases.push(TestCase::try_from(record)?);
    }
    Ok(cases)
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, QaError> {
    let content = std::fs::read_to_string(path)?;
    let cases = parse_test_cases(&content)?;
    tracing::info!(path = %path.display(), cases = cases.len(), "[Eval] Test cases loaded");
    Ok(cases)
}
