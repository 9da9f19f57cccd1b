use ragserve_core::Confidence;

/// Answer returned when nothing was retrieved.
pub const NO_INFORMATION_ANSWER: &str = "No relevant information found.";

/// Maximum number of characters of the runner-up document quoted as related info.
pub const RELATED_INFO_CHARS: usize = 200;

/// Assemble an answer from ranked retrieval results.
///
/// The answer is a confidence-labelled preamble, the full best document and,
/// when a second document exists, up to [`RELATED_INFO_CHARS`] characters of
/// it. Deterministic for identical inputs; `query` does not influence the
/// template.
pub fn synthesize(_query: &str, documents: &[String], scores: &[f32]) -> String {
    let Some(top) = documents.first() else {
        return NO_INFORMATION_ANSWER.to_string();
    };

    let confidence = Confidence::from_score(scores.first().copied().unwrap_or(0.0));

    let mut answer = format!("Based on retrieved data ({confidence}):\n{top}");

    if let Some(second) = documents.get(1) {
        answer.push_str("\n\nRelated info:\n");
        answer.extend(second.chars().take(RELATED_INFO_CHARS));
    }

    answer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(synthesize("q", &[], &[]), NO_INFORMATION_ANSWER);
    }

    #[test]
    fn test_single_document_has_no_related_section() {
        let answer = synthesize("q", &docs(&["Only one."]), &[0.9]);
        assert_eq!(
            answer,
            "Based on retrieved data (high confidence):\nOnly one."
        );
    }

    #[test]
    fn test_confidence_labels() {
        let d = docs(&["doc"]);
        assert!(synthesize("q", &d, &[0.9]).contains("(high confidence)"));
        assert!(synthesize("q", &d, &[0.6]).contains("(moderate confidence)"));
        assert!(synthesize("q", &d, &[0.3]).contains("(low confidence)"));
    }

    #[test]
    fn test_related_info_is_truncated_by_chars() {
        let long: String = "é".repeat(250);
        let answer = synthesize("q", &[String::from("top"), long], &[0.8, 0.4]);
        let (_, related) = answer.split_once("Related info:\n").unwrap_or_default();
        assert_eq!(related.chars().count(), RELATED_INFO_CHARS);
    }

    #[test]
    fn test_only_two_documents_are_used() {
        let answer = synthesize("q", &docs(&["a", "b", "c"]), &[0.8, 0.7, 0.6]);
        assert_eq!(
            answer,
            "Based on retrieved data (high confidence):\na\n\nRelated info:\nb"
        );
    }
}
