use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::NormalizedInsights;

/// Write insights as pretty JSON
pub fn write_insights_json(insights: &NormalizedInsights, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    serde_json::to_writer_pretty(file, insights).context("Failed to write JSON")?;
    Ok(())
}

/// Human-readable insights report
pub struct HumanReport<'a> {
    insights: &'a NormalizedInsights,
}

impl<'a> HumanReport<'a> {
    pub fn new(insights: &'a NormalizedInsights) -> Self {
        Self { insights }
    }

    /// Format the insights as plain text
    pub fn format(&self) -> String {
        let insights = self.insights;
        let mut output = String::new();

        output.push_str("Call Insights\n");
        output.push_str("=============\n");
        output.push_str(&format!("Rating: {}%\n", insights.rating));
        output.push_str(&format!("Buyer intent: {}\n", insights.buyer_intent));
        output.push_str(&format!("Profanity: {}\n", insights.profanity_level));
        let topics = if insights.topics.is_empty() {
            "No topics available".to_string()
        } else {
            insights.topics.join(", ")
        };
        output.push_str(&format!("Topics: {}\n\n", topics));

        output.push_str("Summary\n-------\n");
        output.push_str(&wrap_text(&insights.summary, 80));
        output.push_str("\n\n");

        push_list(&mut output, "Strengths", &insights.strengths);
        push_list(&mut output, "Areas for Improvement", &insights.areas_for_improvement);

        for (title, text) in [
            ("Conversational Balance", &insights.conversational_balance),
            ("Objection Handling", &insights.objection_handling),
            ("Pitch Optimization", &insights.pitch_optimization),
            ("Call-to-Action Execution", &insights.call_to_action),
        ] {
            if let Some(text) = text {
                output.push_str(&format!("{}\n{}\n", title, "-".repeat(title.len())));
                output.push_str(&wrap_text(text, 80));
                output.push_str("\n\n");
            }
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

fn push_list(output: &mut String, title: &str, items: &[String]) {
    output.push_str(&format!("{}\n{}\n", title, "-".repeat(title.len())));
    if items.is_empty() {
        output.push_str("(none)\n");
    }
    for item in items {
        output.push_str(&format!("• {}\n", item));
    }
    output.push('\n');
}

/// Wrap text at approximately the given width
fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        if line_len + word.len() + 1 > width && line_len > 0 {
            result.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word.len();
    }

    result
}
