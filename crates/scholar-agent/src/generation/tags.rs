//! Keyword-based domain tagging

/// Tag vocabulary: tag -> trigger keywords (matched case-insensitively)
const DOMAIN_VOCABULARY: &[(&str, &[&str])] = &[
    ("Backdoor Attacks", &["backdoor", "trigger", "clean-label", "trojan"]),
    ("Time Series", &["time series", "forecast", "temporal", "sequence"]),
    ("LLM", &["llm", "large language model", "transformer"]),
    ("Computer Vision", &["image", "vision", "cnn", "object detection"]),
    ("NLP", &["language", "text", "token", "bert", "translation"]),
];

/// Tag returned when nothing in the vocabulary matches
pub const FALLBACK_TAG: &str = "General";

/// Infer domain tags for a paper's extracted text, in vocabulary order
pub fn infer_domain_tags(text: &str) -> Vec<String> {
    let low = text.to_lowercase();

    let tags: Vec<String> = DOMAIN_VOCABULARY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| low.contains(k)))
        .map(|(tag, _)| tag.to_string())
        .collect();

    if tags.is_empty() {
        vec![FALLBACK_TAG.to_string()]
    } else {
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_tag() {
        assert_eq!(infer_domain_tags("Soil chemistry of wetlands"), vec!["General"]);
    }

    #[test]
    fn test_multiple_tags_in_vocabulary_order() {
        let tags = infer_domain_tags("A Transformer for TIME SERIES forecasting");
        assert_eq!(tags, vec!["Time Series", "LLM"]);
    }

    #[test]
    fn test_backdoor() {
        let tags = infer_domain_tags("Clean-label trojan triggers in CNN image classifiers");
        assert_eq!(tags, vec!["Backdoor Attacks", "Computer Vision"]);
    }
}
