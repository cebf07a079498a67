use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Routes
// ============================================================================

/// Handler category a query is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Visual,
    HrKpi,
    SalesKpi,
    RagDocs,
}

/// Coarse grouping used by the weighting and threshold tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteCategory {
    /// Structured analytics handlers (hr_kpi, sales_kpi)
    Kpi,
    /// Conversational, document and image handlers
    General,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Visual, Route::HrKpi, Route::SalesKpi, Route::RagDocs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::HrKpi => "hr_kpi",
            Self::SalesKpi => "sales_kpi",
            Self::RagDocs => "rag_docs",
        }
    }

    pub fn category(self) -> RouteCategory {
        match self {
            Self::HrKpi | Self::SalesKpi => RouteCategory::Kpi,
            Self::Visual | Self::RagDocs => RouteCategory::General,
        }
    }

    pub fn is_kpi(self) -> bool {
        self.category() == RouteCategory::Kpi
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visual" => Ok(Self::Visual),
            "hr_kpi" => Ok(Self::HrKpi),
            "sales_kpi" => Ok(Self::SalesKpi),
            "rag_docs" => Ok(Self::RagDocs),
            other => Err(format!("unknown route '{}'", other)),
        }
    }
}

// ============================================================================
// Query input
// ============================================================================

/// One prior turn of the conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exchange {
    pub query: String,
    pub answer: String,
    /// Route that answered the turn, when known
    #[serde(default)]
    pub route: Option<Route>,
}

/// Immutable request input: raw text, image flag and prior exchanges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub has_image: bool,
    #[serde(default)]
    pub history: Vec<Exchange>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            has_image: false,
            history: Vec::new(),
        }
    }

    pub fn with_image(mut self, has_image: bool) -> Self {
        self.has_image = has_image;
        self
    }

    pub fn with_history(mut self, history: Vec<Exchange>) -> Self {
        self.history = history;
        self
    }

    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Route of the most recent exchange that recorded one.
    pub fn last_route(&self) -> Option<Route> {
        self.history.iter().rev().find_map(|e| e.route)
    }
}

// ============================================================================
// Routing output
// ============================================================================

/// Outcome of routing a single query. Produced once by one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route: Route,
    pub normalized_query: String,
    /// 0.0 - 1.0
    pub confidence: f32,
    pub reason: String,
}

impl RoutingDecision {
    pub fn new(
        route: Route,
        normalized_query: impl Into<String>,
        confidence: f32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            route,
            normalized_query: normalized_query.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }
}
