use crate::error::{GradeError, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Closed categorical domain with a lowercase wire string per variant.
/// Every domain carries an `Unknown` default.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
            #[default]
            #[serde(rename = "unknown")]
            Unknown,
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+ $name::Unknown];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown => "unknown",
                }
            }

            /// Case-insensitive lookup of a wire value
            pub fn from_str(s: &str) -> Option<Self> {
                let s = s.trim();
                Self::ALL.iter().copied().find(|v| v.as_str().eq_ignore_ascii_case(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Category for $name {
            fn parse(s: &str) -> Option<Self> {
                Self::from_str(s)
            }

            fn allowed() -> String {
                Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
            }
        }
    };
}

trait Category: Copy + Default {
    fn parse(s: &str) -> Option<Self>;
    fn allowed() -> String;
}

wire_enum!(
    /// Study design as reported by the paper
    StudyType {
        RandomizedControlledTrial => "randomized controlled trial",
        SystematicReview => "systematic review",
        CohortStudy => "cohort study",
        CaseControlStudy => "case-control study",
        CaseSeries => "case series",
    }
);

wire_enum!(
    /// Methodology taxonomy, independent of `StudyType` (the two may disagree)
    Methodology {
        SystematicReview => "systematic review",
        CohortStudy => "cohort study",
        CaseControl => "case-control",
        CrossSectional => "cross-sectional",
        Observational => "observational",
    }
);

wire_enum!(
    /// Used for control group and randomization
    Presence {
        Yes => "yes",
        No => "no",
    }
);

wire_enum!(
    Blinding {
        DoubleBlind => "double-blind",
        SingleBlind => "single-blind",
        No => "no",
    }
);

wire_enum!(
    FollowUpUnit {
        Weeks => "weeks",
        Months => "months",
        Years => "years",
    }
);

wire_enum!(
    StatisticalAnalysis {
        Comprehensive => "comprehensive",
        Adequate => "adequate",
        Basic => "basic",
    }
);

wire_enum!(
    /// GRADE quality rating (risk of bias, consistency, directness, precision)
    QualityRating {
        Low => "low",
        Moderate => "moderate",
        High => "high",
    }
);

impl FollowUpUnit {
    /// Parse the unit word as it appears in text ("Months", "years", ...)
    pub fn from_text(word: &str) -> Self {
        Self::from_str(word).unwrap_or_default()
    }
}

pub const UNKNOWN_TITLE: &str = "Unknown";

/// Structured study attributes. Every field always holds a value.
/// Inbound records go through `from_json` / `from_form`, never serde.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperRecord {
    pub paper_id: String,
    pub title: String,
    pub study_type: StudyType,
    pub methodology: Methodology,
    pub sample_size: u32,
    pub control_group: Presence,
    pub randomization: Presence,
    pub blinding: Blinding,
    pub follow_up: u32,
    pub follow_up_unit: FollowUpUnit,
    pub statistical_analysis: StatisticalAnalysis,
    pub risk_of_bias: QualityRating,
    pub consistency: QualityRating,
    pub directness: QualityRating,
    pub precision: QualityRating,
}

impl PaperRecord {
    /// The all-defaults record. Single source of truth for field defaults.
    pub fn with_defaults(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: UNKNOWN_TITLE.to_string(),
            study_type: StudyType::Unknown,
            methodology: Methodology::Unknown,
            sample_size: 0,
            control_group: Presence::Unknown,
            randomization: Presence::Unknown,
            blinding: Blinding::Unknown,
            follow_up: 0,
            follow_up_unit: FollowUpUnit::Unknown,
            statistical_analysis: StatisticalAnalysis::Unknown,
            risk_of_bias: QualityRating::Unknown,
            consistency: QualityRating::Unknown,
            directness: QualityRating::Unknown,
            precision: QualityRating::Unknown,
        }
    }

    /// Coerce a caller-supplied JSON object into a record.
    ///
    /// Missing, null and empty-string fields take their defaults. Numeric
    /// fields accept integers or numeric strings; categorical fields accept
    /// their wire values in any case.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            GradeError::MalformedInput(format!(
                "expected a JSON object describing a paper, got {}",
                json_kind(value)
            ))
        })?;

        let paper_id = match text_field(obj, "paper_id")? {
            Some(id) if !id.is_empty() => id,
            _ => generate_paper_id("REQ", Local::now()),
        };

        let mut record = Self::with_defaults(paper_id);
        if let Some(title) = text_field(obj, "title")? {
            record.title = title;
        }
        record.study_type = category_field(obj, "study_type")?;
        record.methodology = category_field(obj, "methodology")?;
        record.sample_size = count_field(obj, "sample_size")?;
        record.control_group = category_field(obj, "control_group")?;
        record.randomization = category_field(obj, "randomization")?;
        record.blinding = category_field(obj, "blinding")?;
        record.follow_up = count_field(obj, "follow_up")?;
        record.follow_up_unit = category_field(obj, "follow_up_unit")?;
        record.statistical_analysis = category_field(obj, "statistical_analysis")?;
        record.risk_of_bias = category_field(obj, "risk_of_bias")?;
        record.consistency = category_field(obj, "consistency")?;
        record.directness = category_field(obj, "directness")?;
        record.precision = category_field(obj, "precision")?;

        Ok(record)
    }

    /// Coerce submitted form fields (all strings) into a record
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self> {
        let obj: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self::from_json(&Value::Object(obj))
    }
}

impl Default for PaperRecord {
    fn default() -> Self {
        Self::with_defaults(String::new())
    }
}

/// Paper id derived from the processing timestamp, e.g. `PDF_20240131_154500`
pub fn generate_paper_id(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn text_field(obj: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(GradeError::validation(
            field,
            format!("expected a string, got {}", json_kind(other)),
        )),
    }
}

fn count_field(obj: &Map<String, Value>, field: &str) -> Result<u32> {
    let invalid = |shown: String| {
        GradeError::validation(
            field,
            format!("expected a non-negative integer, got {}", shown),
        )
    };

    match obj.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return u32::try_from(v).map_err(|_| invalid(n.to_string()));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
                _ => Err(invalid(n.to_string())),
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<u32>()
                .map_err(|_| invalid(format!("\"{}\"", s)))
        }
        Some(other) => Err(invalid(json_kind(other).to_string())),
    }
}

fn category_field<T: Category>(obj: &Map<String, Value>, field: &str) -> Result<T> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(T::default()),
        Some(Value::String(s)) => T::parse(s).ok_or_else(|| {
            GradeError::validation(
                field,
                format!("expected one of [{}], got \"{}\"", T::allowed(), s),
            )
        }),
        Some(other) => Err(GradeError::validation(
            field,
            format!("expected a string, got {}", json_kind(other)),
        )),
    }
}
