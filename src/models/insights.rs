use serde::{Deserialize, Serialize};

use super::report::{RawAnalysisReport, Section};

/// Stable, UI-facing insights for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInsights {
    pub summary: String,
    /// Overall call score, 0-100
    pub rating: u32,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    /// Open-ended label such as "Interested" or "Neutral"
    pub buyer_intent: String,
    pub profanity_level: String,
    /// At most five vocabulary topics
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversational_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objection_handling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_optimization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    /// Report exactly as received from the analysis routine
    #[serde(default)]
    pub raw_insights: RawAnalysisReport,
}

impl NormalizedInsights {
    /// All-defaults insights, built from [`FIELD_TABLE`]
    pub fn fallback(raw_insights: RawAnalysisReport) -> Self {
        Self {
            summary: default_text(InsightField::Summary).to_string(),
            rating: default_score(InsightField::Rating),
            strengths: Vec::new(),
            areas_for_improvement: Vec::new(),
            buyer_intent: default_text(InsightField::BuyerIntent).to_string(),
            profanity_level: default_text(InsightField::ProfanityLevel).to_string(),
            topics: Vec::new(),
            conversational_balance: None,
            objection_handling: None,
            pitch_optimization: None,
            call_to_action: None,
            raw_insights,
        }
    }

    /// Free text that topic extraction scans, summary first
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.summary.as_str()];
        parts.extend(self.strengths.iter().map(String::as_str));
        parts.extend(self.areas_for_improvement.iter().map(String::as_str));
        for text in [
            &self.conversational_balance,
            &self.objection_handling,
            &self.pitch_optimization,
            &self.call_to_action,
        ]
        .into_iter()
        .flatten()
        {
            parts.push(text);
        }
        parts.join("\n")
    }
}

/// Target fields filled from the raw report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsightField {
    Summary,
    Rating,
    Strengths,
    AreasForImprovement,
    BuyerIntent,
    ProfanityLevel,
    ConversationalBalance,
    ObjectionHandling,
    PitchOptimization,
    CallToAction,
}

impl InsightField {
    pub const ALL: [InsightField; 10] = [
        InsightField::Summary,
        InsightField::Rating,
        InsightField::Strengths,
        InsightField::AreasForImprovement,
        InsightField::BuyerIntent,
        InsightField::ProfanityLevel,
        InsightField::ConversationalBalance,
        InsightField::ObjectionHandling,
        InsightField::PitchOptimization,
        InsightField::CallToAction,
    ];

    /// Position of this field's row in [`FIELD_TABLE`]
    fn row(self) -> usize {
        match self {
            InsightField::Summary => 0,
            InsightField::Rating => 1,
            InsightField::Strengths => 2,
            InsightField::AreasForImprovement => 3,
            InsightField::BuyerIntent => 4,
            InsightField::ProfanityLevel => 5,
            InsightField::ConversationalBalance => 6,
            InsightField::ObjectionHandling => 7,
            InsightField::PitchOptimization => 8,
            InsightField::CallToAction => 9,
        }
    }
}

/// How a source value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Score,
    List,
    OptionalText,
}

/// Value substituted when the source is absent or empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Score(u32),
    EmptyList,
    Unset,
}

/// One row of the section -> target mapping
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: InsightField,
    pub section: Section,
    /// Candidate keys inside the decoded section, first match wins
    pub source_keys: &'static [&'static str],
    pub kind: FieldKind,
    pub default: FieldDefault,
}

pub const DEFAULT_SUMMARY: &str = "No summary available";
pub const DEFAULT_BUYER_INTENT: &str = "Neutral";
pub const DEFAULT_PROFANITY_LEVEL: &str = "Clean";

/// Every mapped field with its source and default, in one place
pub static FIELD_TABLE: [FieldSpec; 10] = [
    FieldSpec {
        field: InsightField::Summary,
        section: Section::CallSummary,
        source_keys: &["summary"],
        kind: FieldKind::Text,
        default: FieldDefault::Text(DEFAULT_SUMMARY),
    },
    FieldSpec {
        field: InsightField::Rating,
        section: Section::CallSummary,
        source_keys: &["rating"],
        kind: FieldKind::Score,
        default: FieldDefault::Score(0),
    },
    FieldSpec {
        field: InsightField::Strengths,
        section: Section::CallSummary,
        source_keys: &["strengths"],
        kind: FieldKind::List,
        default: FieldDefault::EmptyList,
    },
    FieldSpec {
        field: InsightField::AreasForImprovement,
        section: Section::CallSummary,
        source_keys: &["areas_for_improvement"],
        kind: FieldKind::List,
        default: FieldDefault::EmptyList,
    },
    FieldSpec {
        field: InsightField::BuyerIntent,
        section: Section::BuyerIntent,
        source_keys: &["nlp", "intent", "buyer_intent"],
        kind: FieldKind::Text,
        default: FieldDefault::Text(DEFAULT_BUYER_INTENT),
    },
    FieldSpec {
        field: InsightField::ProfanityLevel,
        section: Section::ProfanityCheck,
        source_keys: &["severity level", "severity_level"],
        kind: FieldKind::Text,
        default: FieldDefault::Text(DEFAULT_PROFANITY_LEVEL),
    },
    FieldSpec {
        field: InsightField::ConversationalBalance,
        section: Section::CustomRagAnalysis,
        source_keys: &["Conversational Balance"],
        kind: FieldKind::OptionalText,
        default: FieldDefault::Unset,
    },
    FieldSpec {
        field: InsightField::ObjectionHandling,
        section: Section::CustomRagAnalysis,
        source_keys: &["Objection Handling"],
        kind: FieldKind::OptionalText,
        default: FieldDefault::Unset,
    },
    FieldSpec {
        field: InsightField::PitchOptimization,
        section: Section::CustomRagAnalysis,
        source_keys: &["Pitch Optimization"],
        kind: FieldKind::OptionalText,
        default: FieldDefault::Unset,
    },
    FieldSpec {
        field: InsightField::CallToAction,
        section: Section::CustomRagAnalysis,
        source_keys: &["Call-to-Action Execution", "Call to Action"],
        kind: FieldKind::OptionalText,
        default: FieldDefault::Unset,
    },
];

pub fn spec_for(field: InsightField) -> &'static FieldSpec {
    &FIELD_TABLE[field.row()]
}

/// Text default for `field`, empty when the table has none
pub fn default_text(field: InsightField) -> &'static str {
    match spec_for(field).default {
        FieldDefault::Text(text) => text,
        _ => "",
    }
}

pub fn default_score(field: InsightField) -> u32 {
    match spec_for(field).default {
        FieldDefault::Score(score) => score,
        _ => 0,
    }
}
