/// Fixed business-topic vocabulary, in match-priority order
pub const TOPIC_VOCABULARY: [&str; 18] = [
    "Pricing",
    "Budget",
    "Product Features",
    "Demo",
    "Implementation",
    "Integration",
    "Security",
    "Support",
    "Training",
    "Onboarding",
    "Timeline",
    "Contract",
    "Competition",
    "Follow-up",
    "Free Trial",
    "Discount",
    "Renewal",
    "Compliance",
];

/// Vocabulary terms mentioned in `text`, case-insensitively.
///
/// Returns at most `max_topics` terms in vocabulary order, not ranked by
/// frequency or relevance.
// TODO: rank by mention count once call volume justifies a scoring pass
pub fn extract_topics(text: &str, vocabulary: &[String], max_topics: usize) -> Vec<String> {
    let haystack = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|term| !term.is_empty() && haystack.contains(&term.to_lowercase()))
        .take(max_topics)
        .cloned()
        .collect()
}

pub fn default_vocabulary() -> Vec<String> {
    TOPIC_VOCABULARY.iter().map(|t| t.to_string()).collect()
}
