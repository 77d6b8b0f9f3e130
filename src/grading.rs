// =============================================================================
// Evidence Grading Engine
// =============================================================================
//
// Maps a PaperRecord to a GRADE-style evidence level. Every dimension gets a
// small integer sub-score; the composite is their plain sum and is bucketed by
// fixed thresholds. Each sub-score is non-decreasing in its dimension's
// quality order, so improving one attribute never lowers the composite or the
// level. "unknown" always scores the floor of its dimension.

use crate::error::{GradeError, Result};
use crate::papers::record::{
    Blinding, FollowUpUnit, Methodology, PaperRecord, Presence, QualityRating,
    StatisticalAnalysis, StudyType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Final categorical grade, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EvidenceLevel {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Moderate,
    High,
}

impl EvidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceLevel::VeryLow => "Very Low",
            EvidenceLevel::Low => "Low",
            EvidenceLevel::Moderate => "Moderate",
            EvidenceLevel::High => "High",
        }
    }
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const COMPOSITE_KEY: &str = "composite";

/// Highest composite the scoring table can produce
pub const MAX_COMPOSITE: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradingResult {
    pub evidence_level: EvidenceLevel,
    /// Per-dimension sub-scores plus `composite`
    pub scores: BTreeMap<String, u32>,
}

impl GradingResult {
    pub fn composite(&self) -> u32 {
        self.scores.get(COMPOSITE_KEY).copied().unwrap_or(0)
    }
}

/// Minimum composite for each level above Very Low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub high: u32,
    pub moderate: u32,
    pub low: u32,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            high: 24,
            moderate: 16,
            low: 8,
        }
    }
}

impl GradeThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.low == 0 || self.low >= self.moderate || self.moderate >= self.high {
            return Err(GradeError::Config(format!(
                "thresholds must satisfy 0 < low < moderate < high, got low={} moderate={} high={}",
                self.low, self.moderate, self.high
            )));
        }
        if self.high > MAX_COMPOSITE {
            return Err(GradeError::Config(format!(
                "high threshold {} is above the maximum composite {}",
                self.high, MAX_COMPOSITE
            )));
        }
        Ok(())
    }

    pub fn level_for(&self, composite: u32) -> EvidenceLevel {
        if composite >= self.high {
            EvidenceLevel::High
        } else if composite >= self.moderate {
            EvidenceLevel::Moderate
        } else if composite >= self.low {
            EvidenceLevel::Low
        } else {
            EvidenceLevel::VeryLow
        }
    }
}

/// Outcome of one item in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Graded(GradingResult),
    Failed {
        index: usize,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl BatchOutcome {
    pub fn is_graded(&self) -> bool {
        matches!(self, BatchOutcome::Graded(_))
    }
}

/// Response to a grading payload: one object in, one result out; a list in,
/// a list out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GradeResponse {
    Single(GradingResult),
    Batch(Vec<BatchOutcome>),
}

/// Stateless grader. Holds only its thresholds, so one instance can be
/// shared across requests.
#[derive(Debug, Clone, Default)]
pub struct EvidenceGrader {
    thresholds: GradeThresholds,
}

impl EvidenceGrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: GradeThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// Grader for configured thresholds. Invalid values are logged and the
    /// defaults stay in force.
    pub fn configured(thresholds: GradeThresholds) -> Self {
        Self::with_thresholds(thresholds).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid configured thresholds, using defaults");
            Self::new()
        })
    }

    pub fn thresholds(&self) -> GradeThresholds {
        self.thresholds
    }

    pub fn grade(&self, record: &PaperRecord) -> GradingResult {
        let dimensions = [
            ("study_design", study_design_score(record.study_type)),
            ("methodology", methodology_score(record.methodology)),
            ("sample_size", sample_size_score(record.sample_size)),
            ("control_group", presence_score(record.control_group)),
            ("randomization", presence_score(record.randomization)),
            ("blinding", blinding_score(record.blinding)),
            ("follow_up", follow_up_score(record.follow_up, record.follow_up_unit)),
            ("statistical_analysis", statistical_score(record.statistical_analysis)),
            ("risk_of_bias", risk_of_bias_score(record.risk_of_bias)),
            ("consistency", quality_score(record.consistency)),
            ("directness", quality_score(record.directness)),
            ("precision", quality_score(record.precision)),
        ];

        let composite: u32 = dimensions.iter().map(|(_, score)| score).sum();
        let evidence_level = self.thresholds.level_for(composite);

        let mut scores: BTreeMap<String, u32> = dimensions
            .iter()
            .map(|(name, score)| (name.to_string(), *score))
            .collect();
        scores.insert(COMPOSITE_KEY.to_string(), composite);

        tracing::debug!(
            paper_id = %record.paper_id,
            composite,
            level = %evidence_level,
            "graded paper"
        );

        GradingResult { evidence_level, scores }
    }

    /// Coerce a caller-supplied object, then grade it
    pub fn grade_value(&self, value: &Value) -> Result<GradingResult> {
        let record = PaperRecord::from_json(value)?;
        Ok(self.grade(&record))
    }

    /// Grade each item independently. Output order and length match the input;
    /// a failing item is recorded at its own index.
    pub fn grade_batch(&self, items: &[Value]) -> Vec<BatchOutcome> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| match self.grade_value(item) {
                Ok(result) => BatchOutcome::Graded(result),
                Err(e) => {
                    tracing::warn!(index, error = %e, "batch item failed to grade");
                    BatchOutcome::Failed {
                        index,
                        field: e.field().map(str::to_string),
                        error: e.to_string(),
                    }
                }
            })
            .collect()
    }

    /// Dispatch on payload shape: object → single grade, array → batch
    pub fn grade_payload(&self, payload: &Value) -> Result<GradeResponse> {
        match payload {
            Value::Object(_) => self.grade_value(payload).map(GradeResponse::Single),
            Value::Array(items) => Ok(GradeResponse::Batch(self.grade_batch(items))),
            _ => Err(GradeError::MalformedInput(
                "expected a paper object or a list of paper objects".to_string(),
            )),
        }
    }
}

// ==================== Sub-score tables ====================

fn study_design_score(study_type: StudyType) -> u32 {
    match study_type {
        StudyType::SystematicReview => 8,
        StudyType::RandomizedControlledTrial => 8,
        StudyType::CohortStudy => 5,
        StudyType::CaseControlStudy => 4,
        StudyType::CaseSeries => 2,
        StudyType::Unknown => 0,
    }
}

fn methodology_score(methodology: Methodology) -> u32 {
    match methodology {
        Methodology::SystematicReview => 2,
        Methodology::CohortStudy
        | Methodology::CaseControl
        | Methodology::CrossSectional
        | Methodology::Observational => 1,
        Methodology::Unknown => 0,
    }
}

fn sample_size_score(sample_size: u32) -> u32 {
    match sample_size {
        n if n >= 1000 => 2,
        n if n >= 100 => 1,
        _ => 0,
    }
}

fn presence_score(presence: Presence) -> u32 {
    match presence {
        Presence::Yes => 2,
        Presence::No | Presence::Unknown => 0,
    }
}

fn blinding_score(blinding: Blinding) -> u32 {
    match blinding {
        Blinding::DoubleBlind => 2,
        Blinding::SingleBlind => 1,
        Blinding::No | Blinding::Unknown => 0,
    }
}

/// Follow-up length in months. A bare number with no unit is read as months.
pub fn follow_up_months(follow_up: u32, unit: FollowUpUnit) -> u32 {
    match unit {
        FollowUpUnit::Weeks => follow_up / 4,
        FollowUpUnit::Years => follow_up.saturating_mul(12),
        FollowUpUnit::Months | FollowUpUnit::Unknown => follow_up,
    }
}

fn follow_up_score(follow_up: u32, unit: FollowUpUnit) -> u32 {
    match follow_up_months(follow_up, unit) {
        m if m >= 12 => 2,
        m if m >= 6 => 1,
        _ => 0,
    }
}

fn statistical_score(analysis: StatisticalAnalysis) -> u32 {
    match analysis {
        StatisticalAnalysis::Comprehensive => 3,
        StatisticalAnalysis::Adequate => 2,
        StatisticalAnalysis::Basic => 1,
        StatisticalAnalysis::Unknown => 0,
    }
}

/// Lower risk of bias is better
fn risk_of_bias_score(rating: QualityRating) -> u32 {
    match rating {
        QualityRating::Low => 2,
        QualityRating::Moderate => 1,
        QualityRating::High | QualityRating::Unknown => 0,
    }
}

fn quality_score(rating: QualityRating) -> u32 {
    match rating {
        QualityRating::High => 2,
        QualityRating::Moderate => 1,
        QualityRating::Low | QualityRating::Unknown => 0,
    }
}
