use serde_json::Value;

/// Coerce a list-valued field into its entries.
///
/// Arrays are taken as-is in order. Strings are treated as bullet text and
/// split on `delimiter`, dropping empty entries. Anything else yields `None`.
pub fn coerce_list(value: &Value, delimiter: &str) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Value::String(text) => Some(split_bullets(text, delimiter)),
        _ => None,
    }
}

/// Split `"\n• A\n• B"` style text into `["A", "B"]`
pub fn split_bullets(text: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return single_entry(text);
    }

    let marker = delimiter.trim_start();
    text.split(delimiter)
        .map(|entry| {
            let entry = entry.trim();
            entry.strip_prefix(marker).unwrap_or(entry).trim()
        })
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn single_entry(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BULLET: &str = "\n• ";

    #[test]
    fn test_split_bullets() {
        assert_eq!(split_bullets("\n• A\n• B", BULLET), vec!["A", "B"]);
        assert!(split_bullets("", BULLET).is_empty());
    }

    #[test]
    fn test_split_bullets_drops_empty_entries() {
        assert_eq!(split_bullets("\n• A\n• \n• B\n• ", BULLET), vec!["A", "B"]);
        assert!(split_bullets("\n• ", BULLET).is_empty());
    }

    #[test]
    fn test_split_leading_marker_without_newline() {
        assert_eq!(split_bullets("• A\n• B", BULLET), vec!["A", "B"]);
    }

    #[test]
    fn test_plain_text_is_one_entry() {
        assert_eq!(split_bullets("Good rapport", BULLET), vec!["Good rapport"]);
    }

    #[test]
    fn test_coerce_array_unchanged() {
        let value = json!(["second", "first", null, 3]);
        assert_eq!(
            coerce_list(&value, BULLET),
            Some(vec!["second".to_string(), "first".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn test_coerce_unsupported() {
        assert_eq!(coerce_list(&json!({"a": 1}), BULLET), None);
        assert_eq!(coerce_list(&json!(5), BULLET), None);
    }
}
