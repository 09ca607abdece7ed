use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::heuristics::{HeuristicsConfig, coerce_list, coerce_score, coerce_text, extract_topics};
use crate::models::{
    FIELD_TABLE, FieldKind, FieldSpec, InsightField, NormalizedInsights, RawAnalysisReport,
    Section, SectionPayload,
};

/// A source value after coercion to its field kind
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Score(u32),
    List(Vec<String>),
}

/// Execute Stage 2: reconcile a raw report into the stable insights shape
///
/// Never fails. For every section:
/// 1. Decode the payload, treating anything undecodable as empty
/// 2. Unwrap one level of same-named nested `output` if present
/// 3. Map fields through `FIELD_TABLE`, substituting its defaults
/// 4. Split bullet text into list entries
///
/// Topics are then derived from the combined text.
pub fn execute_stage2(raw: RawAnalysisReport, config: &HeuristicsConfig) -> NormalizedInsights {
    if raw.is_empty() {
        debug!("Stage 2: empty report, using defaults");
    }
    if let Some(message) = raw.reported_error() {
        warn!("Stage 2: report carries an error: {}", message);
    }

    let sections: HashMap<Section, Map<String, Value>> = Section::ALL
        .into_iter()
        .map(|section| (section, decode(&raw, section)))
        .collect();

    let mut insights = NormalizedInsights::fallback(RawAnalysisReport::default());
    for spec in FIELD_TABLE.iter() {
        let source = sections
            .get(&spec.section)
            .and_then(|fields| spec.source_keys.iter().find_map(|key| fields.get(*key)))
            .filter(|value| !value.is_null());

        match source.and_then(|value| coerce(spec, value, config)) {
            Some(value) => assign(&mut insights, spec.field, value),
            None => debug!(
                section = spec.section.key(),
                field = ?spec.field,
                "Stage 2: using default"
            ),
        }
    }

    let mut haystack = insights.searchable_text();
    for text in unmapped_texts(&sections) {
        haystack.push('\n');
        haystack.push_str(text);
    }
    insights.topics = extract_topics(&haystack, &config.topic_vocabulary, config.max_topics);
    insights.raw_insights = raw;

    debug!(
        "Stage 2: normalized (rating {}, {} strengths, {} topics)",
        insights.rating,
        insights.strengths.len(),
        insights.topics.len()
    );
    insights
}

fn decode(raw: &RawAnalysisReport, section: Section) -> Map<String, Value> {
    let payload = raw.section(section);
    match &payload {
        SectionPayload::Absent => debug!(section = section.key(), "section absent"),
        SectionPayload::Empty => debug!(section = section.key(), "section empty"),
        SectionPayload::Malformed(e) => {
            warn!(section = section.key(), error = %e, "section not decodable, treating as empty")
        }
        SectionPayload::DoubleEncoded(_) => {
            debug!(section = section.key(), "unwrapped double-encoded section")
        }
        SectionPayload::Decoded(_) => {}
    }
    payload.into_fields()
}

/// Free text in decoded sections that no table row consumes
fn unmapped_texts(sections: &HashMap<Section, Map<String, Value>>) -> Vec<&str> {
    let mut texts = Vec::new();
    for section in Section::ALL {
        let Some(fields) = sections.get(&section) else {
            continue;
        };
        for (key, value) in fields {
            let mapped = FIELD_TABLE
                .iter()
                .any(|spec| spec.section == section && spec.source_keys.contains(&key.as_str()));
            if mapped {
                continue;
            }
            match value {
                Value::String(text) => texts.push(text.as_str()),
                Value::Array(items) => texts.extend(items.iter().filter_map(Value::as_str)),
                _ => {}
            }
        }
    }
    texts
}

fn coerce(spec: &FieldSpec, value: &Value, config: &HeuristicsConfig) -> Option<FieldValue> {
    let coerced = match spec.kind {
        FieldKind::Text | FieldKind::OptionalText => coerce_text(value).map(FieldValue::Text),
        FieldKind::Score => coerce_score(value).map(FieldValue::Score),
        FieldKind::List => coerce_list(value, &config.bullet_delimiter).map(FieldValue::List),
    };
    if coerced.is_none() {
        debug!(
            section = spec.section.key(),
            field = ?spec.field,
            value = %value,
            "value not usable"
        );
    }
    coerced
}

fn assign(insights: &mut NormalizedInsights, field: InsightField, value: FieldValue) {
    match (field, value) {
        (InsightField::Summary, FieldValue::Text(text)) => insights.summary = text,
        (InsightField::Rating, FieldValue::Score(score)) => insights.rating = score,
        (InsightField::Strengths, FieldValue::List(items)) => insights.strengths = items,
        (InsightField::AreasForImprovement, FieldValue::List(items)) => {
            insights.areas_for_improvement = items
        }
        (InsightField::BuyerIntent, FieldValue::Text(text)) => insights.buyer_intent = text,
        (InsightField::ProfanityLevel, FieldValue::Text(text)) => insights.profanity_level = text,
        (InsightField::ConversationalBalance, FieldValue::Text(text)) => {
            insights.conversational_balance = Some(text)
        }
        (InsightField::ObjectionHandling, FieldValue::Text(text)) => {
            insights.objection_handling = Some(text)
        }
        (InsightField::PitchOptimization, FieldValue::Text(text)) => {
            insights.pitch_optimization = Some(text)
        }
        (InsightField::CallToAction, FieldValue::Text(text)) => insights.call_to_action = Some(text),
        (field, value) => warn!(?field, ?value, "field kind mismatch in field table"),
    }
}
