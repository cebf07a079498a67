//! Route-category scoring profiles.
//!
//! Weights and thresholds live in one table keyed by [`RouteCategory`] so the
//! policy can be audited and tested as data.

use serde::{Deserialize, Serialize};

use crate::types::{Route, RouteCategory};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub semantic: f64,
    pub completeness: f64,
    pub accuracy: f64,
    pub presentation: f64,
    /// Zero for categories without an executive-format dimension
    pub executive_format: f64,
}

impl DimensionWeights {
    pub fn total(&self) -> f64 {
        self.semantic + self.completeness + self.accuracy + self.presentation + self.executive_format
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub category: RouteCategory,
    pub weights: DimensionWeights,
    /// Quality needed for ACCEPTABLE
    pub quality_threshold: f64,
    /// Quality needed for PERFECT (with a perfect route)
    pub excellence_threshold: f64,
    /// Cosine below which semantic relevance is floored; `None` defers to
    /// the test case or the configured default
    pub semantic_threshold: Option<f64>,
    /// Whether semantic relevance earns benchmark/trend/length bonuses
    pub semantic_bonuses: bool,
}

pub const KPI_PROFILE: ScoringProfile = ScoringProfile {
    category: RouteCategory::Kpi,
    weights: DimensionWeights {
        semantic: 0.15,
        completeness: 0.25,
        accuracy: 0.35,
        presentation: 0.10,
        executive_format: 0.15,
    },
    quality_threshold: 0.63,
    excellence_threshold: 0.75,
    semantic_threshold: Some(0.50),
    semantic_bonuses: true,
};

pub const GENERAL_PROFILE: ScoringProfile = ScoringProfile {
    category: RouteCategory::General,
    weights: DimensionWeights {
        semantic: 0.25,
        completeness: 0.30,
        accuracy: 0.30,
        presentation: 0.15,
        executive_format: 0.0,
    },
    quality_threshold: 0.68,
    excellence_threshold: 0.80,
    semantic_threshold: None,
    semantic_bonuses: false,
};

pub fn profile_for(category: RouteCategory) -> &'static ScoringProfile {
    match category {
        RouteCategory::Kpi => &KPI_PROFILE,
        RouteCategory::General => &GENERAL_PROFILE,
    }
}

pub fn profile_for_route(route: Route) -> &'static ScoringProfile {
    profile_for(route.category())
}
