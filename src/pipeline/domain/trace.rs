use super::candidate::{ColorCandidate, SourceMethod};
use crate::common::labels::{DetectedObject, ScoredLabel};
use crate::pipeline::analysis::PixelAnalysis;
use crate::quota::QuotaDecision;
use crate::taxonomy::{Category, CategoryMatch, Color, RuleEvaluation};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Succeeded,
    /// Ran fine but produced nothing confident enough.
    NoAnswer,
    /// A provider error took the stage out.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: String,
}

/// Stage-specific evidence kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageDetails {
    None,
    Rule {
        rule: String,
        matched_label: String,
    },
    Direct {
        provider: String,
        labels: Vec<ScoredLabel>,
    },
    Ensemble {
        attempted: usize,
        succeeded: usize,
        failures: Vec<ProviderFailure>,
        votes: IndexMap<Color, f32>,
    },
    Pixel(PixelAnalysis),
    CategoryDefault {
        category: Category,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: SourceMethod,
    pub strategy: String,
    pub outcome: StageOutcome,
    pub reason: Option<String>,
    pub duration_us: u64,
    pub candidates: Vec<ColorCandidate>,
    pub details: StageDetails,
}

/// Everything the category decision was based on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTrace {
    pub labels: Vec<ScoredLabel>,
    pub objects: Vec<DetectedObject>,
    pub provider_error: Option<String>,
    pub rules: RuleEvaluation,
    pub matched: CategoryMatch,
    pub duration_us: u64,
}

impl CategoryTrace {
    pub fn without_provider(matched: CategoryMatch) -> Self {
        Self {
            labels: Vec::new(),
            objects: Vec::new(),
            provider_error: None,
            rules: RuleEvaluation::default(),
            matched,
            duration_us: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    pub request_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub input: &'static str,
    pub image_size: Option<(u32, u32)>,
    pub quota: Option<QuotaDecision>,
    pub category: CategoryTrace,
    pub stages: Vec<StageRecord>,
    pub winning_stage: SourceMethod,
    /// Time from request start until the category was settled
    pub categorization_duration_us: Option<u64>,
    pub total_duration_us: u64,
}

impl DebugTrace {
    pub fn stage(&self, stage: SourceMethod) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}
