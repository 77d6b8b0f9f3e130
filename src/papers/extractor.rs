//! Study-attribute extraction from linear paper text
//!
//! Each field has an ordered list of rules. The first rule with any matching
//! pattern decides the field; later rules are never consulted, so text that
//! mentions several vocabularies resolves by declared priority, not by
//! position or frequency. Unmatched fields keep their defaults.

use super::record::{
    generate_paper_id, Blinding, FollowUpUnit, Methodology, PaperRecord, Presence, QualityRating,
    StatisticalAnalysis, StudyType, UNKNOWN_TITLE,
};
use chrono::Local;
use regex::Regex;
use std::sync::LazyLock;

/// One candidate value with its alternative patterns (any one suffices)
pub struct Rule<T> {
    pub value: T,
    pub patterns: Vec<Regex>,
}

impl<T: Copy> Rule<T> {
    fn new(value: T, patterns: &[&str]) -> Self {
        Self {
            value,
            patterns: patterns.iter().map(|p| ci(p)).collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}

/// Value of the first rule (in declared order) that matches anywhere in `text`
pub fn first_match<T: Copy>(text: &str, rules: &[Rule<T>]) -> Option<T> {
    rules.iter().find(|rule| rule.matches(text)).map(|rule| rule.value)
}

/// First pattern whose capture group 1 parses as a count.
/// Group 2, when the pattern has one, is returned alongside.
pub fn first_number<'t>(text: &'t str, patterns: &[Regex]) -> Option<(u32, Option<&'t str>)> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let n = caps.get(1)?.as_str().parse::<u32>().ok()?;
        Some((n, caps.get(2).map(|m| m.as_str())))
    })
}

fn ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("extractor vocabulary must compile")
}

static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(.+?)$").unwrap());

static STUDY_TYPE_RULES: LazyLock<Vec<Rule<StudyType>>> = LazyLock::new(|| {
    vec![
        Rule::new(StudyType::RandomizedControlledTrial, &[r"\b(randomized\s+controlled\s+trial|RCT)\b"]),
        Rule::new(StudyType::SystematicReview, &[r"\b(systematic\s+review|meta-analysis)\b"]),
        Rule::new(StudyType::CohortStudy, &[r"\b(cohort\s+study|prospective\s+study)\b"]),
        Rule::new(StudyType::CaseControlStudy, &[r"\b(case-control\s+study|retrospective\s+study)\b"]),
        Rule::new(StudyType::CaseSeries, &[r"\b(case\s+series|case\s+report)\b"]),
    ]
});

static METHODOLOGY_RULES: LazyLock<Vec<Rule<Methodology>>> = LazyLock::new(|| {
    vec![
        Rule::new(Methodology::SystematicReview, &[r"\b(systematic\s+review|meta-analysis)\b"]),
        Rule::new(Methodology::CohortStudy, &[r"\b(cohort\s+study|prospective\s+study)\b"]),
        Rule::new(Methodology::CaseControl, &[r"\b(case-control\s+study|retrospective\s+study)\b"]),
        Rule::new(Methodology::CrossSectional, &[r"\b(cross-sectional\s+study|survey)\b"]),
        Rule::new(Methodology::Observational, &[r"\b(observational\s+study|descriptive\s+study)\b"]),
    ]
});

static SAMPLE_SIZE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:sample\s+size|n\s*=|participants|subjects|patients)\s*[=:]\s*(\d+)",
        r"(?:total\s+of|included|enrolled)\s+(\d+)\s+(?:patients|participants|subjects)",
        r"(?:study\s+included|study\s+enrolled)\s+(\d+)\s+(?:patients|participants|subjects)",
    ]
    .iter()
    .map(|p| ci(p))
    .collect()
});

static FOLLOW_UP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:follow-up|follow\s+up)\s*(?:period|time)?\s*(?:of)?\s*(\d+)\s*(months|years|weeks)",
        r"(?:followed\s+for|followed\s+up\s+for)\s*(\d+)\s*(months|years|weeks)",
        r"(?:median\s+follow-up|mean\s+follow-up)\s*(?:of)?\s*(\d+)\s*(months|years|weeks)",
    ]
    .iter()
    .map(|p| ci(p))
    .collect()
});

static CONTROL_GROUP_RULES: LazyLock<Vec<Rule<Presence>>> = LazyLock::new(|| {
    vec![
        Rule::new(Presence::Yes, &[
            r"\b(control\s+group|comparison\s+group)\b",
            r"\b(compared\s+with|compared\s+to)\b",
            r"\b(versus|vs\.?)\b",
        ]),
        Rule::new(Presence::No, &[
            r"\b(no\s+control\s+group|single\s+arm|single\s+group)\b",
            r"\b(uncontrolled\s+study)\b",
        ]),
    ]
});

static RANDOMIZATION_RULES: LazyLock<Vec<Rule<Presence>>> = LazyLock::new(|| {
    vec![
        Rule::new(Presence::Yes, &[
            r"\b(randomized|randomisation|randomization)\b",
            r"\b(randomly\s+assigned|random\s+assignment)\b",
        ]),
        Rule::new(Presence::No, &[
            r"\b(non-randomized|non-randomised)\b",
            r"\b(not\s+randomized|not\s+randomised)\b",
        ]),
    ]
});

static BLINDING_RULES: LazyLock<Vec<Rule<Blinding>>> = LazyLock::new(|| {
    vec![
        Rule::new(Blinding::DoubleBlind, &[
            r"\b(double\s*-?\s*blind|double\s*-?\s*blinded)\b",
            r"\b(double\s*-?\s*blind\s+study)\b",
        ]),
        Rule::new(Blinding::SingleBlind, &[
            r"\b(single\s*-?\s*blind|single\s*-?\s*blinded)\b",
            r"\b(single\s*-?\s*blind\s+study)\b",
        ]),
        Rule::new(Blinding::No, &[
            r"\b(no\s+blinding|unblinded|open\s+label)\b",
            r"\b(not\s+blinded)\b",
        ]),
    ]
});

static STATISTICAL_RULES: LazyLock<Vec<Rule<StatisticalAnalysis>>> = LazyLock::new(|| {
    vec![
        Rule::new(StatisticalAnalysis::Comprehensive, &[
            r"\b(comprehensive\s+statistical\s+analysis)\b",
            r"\b(detailed\s+statistical\s+analysis)\b",
            r"\b(advanced\s+statistical\s+methods)\b",
        ]),
        Rule::new(StatisticalAnalysis::Adequate, &[
            r"\b(statistical\s+analysis|statistical\s+methods)\b",
            r"\b(appropriate\s+statistical\s+analysis)\b",
        ]),
        Rule::new(StatisticalAnalysis::Basic, &[
            r"\b(basic\s+statistical\s+analysis)\b",
            r"\b(simple\s+statistical\s+methods)\b",
        ]),
    ]
});

// Quality dimensions: declared order differs per dimension and is kept as-is.

static RISK_OF_BIAS_RULES: LazyLock<Vec<Rule<QualityRating>>> = LazyLock::new(|| {
    vec![
        Rule::new(QualityRating::Low, &[r"\b(low\s+risk\s+of\s+bias|minimal\s+bias)\b"]),
        Rule::new(QualityRating::Moderate, &[r"\b(moderate\s+risk\s+of\s+bias|some\s+bias)\b"]),
        Rule::new(QualityRating::High, &[r"\b(high\s+risk\s+of\s+bias|significant\s+bias)\b"]),
    ]
});

static CONSISTENCY_RULES: LazyLock<Vec<Rule<QualityRating>>> = LazyLock::new(|| {
    vec![
        Rule::new(QualityRating::High, &[r"\b(high\s+consistency|consistent\s+results)\b"]),
        Rule::new(QualityRating::Moderate, &[r"\b(moderate\s+consistency|somewhat\s+consistent)\b"]),
        Rule::new(QualityRating::Low, &[r"\b(low\s+consistency|inconsistent\s+results)\b"]),
    ]
});

static DIRECTNESS_RULES: LazyLock<Vec<Rule<QualityRating>>> = LazyLock::new(|| {
    vec![
        Rule::new(QualityRating::High, &[r"\b(high\s+directness|direct\s+evidence)\b"]),
        Rule::new(QualityRating::Moderate, &[r"\b(moderate\s+directness|somewhat\s+direct)\b"]),
        Rule::new(QualityRating::Low, &[r"\b(low\s+directness|indirect\s+evidence)\b"]),
    ]
});

static PRECISION_RULES: LazyLock<Vec<Rule<QualityRating>>> = LazyLock::new(|| {
    vec![
        Rule::new(QualityRating::High, &[r"\b(high\s+precision|precise\s+estimates)\b"]),
        Rule::new(QualityRating::Moderate, &[r"\b(moderate\s+precision|somewhat\s+precise)\b"]),
        Rule::new(QualityRating::Low, &[r"\b(low\s+precision|imprecise\s+estimates)\b"]),
    ]
});

/// Extract a record from document text, stamping a fresh `PDF_<timestamp>` id
pub fn extract(text: &str) -> PaperRecord {
    extract_with_id(text, generate_paper_id("PDF", Local::now()))
}

/// Extract a record from document text. Never fails.
pub fn extract_with_id(text: &str, paper_id: impl Into<String>) -> PaperRecord {
    let mut record = PaperRecord::with_defaults(paper_id);

    record.title = extract_title(text);

    if let Some(v) = first_match(text, &STUDY_TYPE_RULES) {
        record.study_type = v;
    }
    if let Some(v) = first_match(text, &METHODOLOGY_RULES) {
        record.methodology = v;
    }
    if let Some((n, _)) = first_number(text, &SAMPLE_SIZE_PATTERNS) {
        record.sample_size = n;
    }
    if let Some(v) = first_match(text, &CONTROL_GROUP_RULES) {
        record.control_group = v;
    }
    if let Some(v) = first_match(text, &RANDOMIZATION_RULES) {
        record.randomization = v;
    }
    if let Some(v) = first_match(text, &BLINDING_RULES) {
        record.blinding = v;
    }
    if let Some((n, unit)) = first_number(text, &FOLLOW_UP_PATTERNS) {
        record.follow_up = n;
        record.follow_up_unit = unit.map(FollowUpUnit::from_text).unwrap_or_default();
    }
    if let Some(v) = first_match(text, &STATISTICAL_RULES) {
        record.statistical_analysis = v;
    }
    if let Some(v) = first_match(text, &RISK_OF_BIAS_RULES) {
        record.risk_of_bias = v;
    }
    if let Some(v) = first_match(text, &CONSISTENCY_RULES) {
        record.consistency = v;
    }
    if let Some(v) = first_match(text, &DIRECTNESS_RULES) {
        record.directness = v;
    }
    if let Some(v) = first_match(text, &PRECISION_RULES) {
        record.precision = v;
    }

    tracing::debug!(
        paper_id = %record.paper_id,
        study_type = %record.study_type,
        sample_size = record.sample_size,
        "extracted paper attributes"
    );

    record
}

/// First non-empty line, trimmed. A whitespace-only line still counts and
/// yields an empty title.
fn extract_title(text: &str) -> String {
    TITLE_LINE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}
