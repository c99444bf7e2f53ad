//! Markdown artifact builders for translation, summary and improvement drafts

/// Builds the markdown documents written for each paper
pub struct ArtifactBuilder;

impl ArtifactBuilder {
    /// Number of chunks rendered into the translation draft
    const TRANSLATION_CHUNKS: usize = 8;
    /// Number of chunks used as summary key points
    const SUMMARY_POINTS: usize = 5;

    /// Draft translation: source excerpt and translation stub per chunk
    pub fn translation(title: &str, target_language: &str, chunks: &[String]) -> String {
        let mut lines = vec![
            format!("# Full Translation: {}", title),
            String::new(),
            format!("Target language: {}", target_language),
            String::new(),
            "Note: baseline draft. Formulas and citation markers are kept as-is.".to_string(),
            String::new(),
        ];

        let fallback = ["No usable text chunks were produced.".to_string()];
        let sample: &[String] = if chunks.is_empty() {
            &fallback
        } else {
            &chunks[..chunks.len().min(Self::TRANSLATION_CHUNKS)]
        };

        for (idx, chunk) in sample.iter().enumerate() {
            lines.push(format!("## Paragraph {}", idx + 1));
            lines.push(String::new());
            lines.push(format!("Source: {}", truncate_chars(chunk, 350)));
            lines.push(String::new());
            lines.push(format!(
                "Translation ({}): [baseline] {}",
                target_language,
                truncate_chars(chunk, 250)
            ));
            lines.push(String::new());
        }

        format!("{}\n", lines.join("\n").trim())
    }

    /// Summary: the template followed by key points from the leading chunks
    pub fn summary(title: &str, template: &str, chunks: &[String]) -> String {
        let mut lines = vec![
            template.trim().to_string(),
            String::new(),
            "---".to_string(),
            String::new(),
            format!("## Automatic summary of \"{}\"", title),
            String::new(),
        ];

        if chunks.is_empty() {
            lines.push("- Key point 1: no text available, a meaningful summary cannot be produced.".to_string());
        } else {
            for (idx, point) in chunks.iter().take(Self::SUMMARY_POINTS).enumerate() {
                lines.push(format!("- Key point {}: {}", idx + 1, truncate_chars(point, 220)));
            }
        }

        lines.extend(
            [
                "",
                "## Method overview",
                "- Pipeline: parse -> translate -> summarize -> suggest improvements.",
                "- All outputs are written as structured markdown files.",
                "",
                "## Experiments and evidence",
                "- Generated from the uploaded paper's text chunks.",
                "",
                "## Limitations",
                "- OCR and domain adaptation are placeholders; plug in a real model for stronger results.",
                "",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        lines.join("\n")
    }

    /// Improvement suggestions tied to the inferred domain tags
    pub fn improvement(title: &str, tags: &[String], chunks: &[String]) -> String {
        let evidence = chunks
            .first()
            .map(|c| truncate_chars(c, 260))
            .unwrap_or_else(|| "No evidence excerpt available.".to_string());

        let lines = [
            format!("# Improvement suggestions for \"{}\"", title),
            String::new(),
            format!("Related domains: {}", tags.join(", ")),
            String::new(),
            "## 1. Data and evaluation".to_string(),
            "- Broaden dataset coverage and add out-of-distribution tests.".to_string(),
            "- Add ablations for the key components.".to_string(),
            String::new(),
            "## 2. Model design".to_string(),
            "- Compare against stronger recent baselines and report compute trade-offs.".to_string(),
            "- Fix random seeds and environments to improve reproducibility.".to_string(),
            String::new(),
            "## 3. Possible directions".to_string(),
            "- Combine retrieval-augmented reasoning with robust training signals.".to_string(),
            "- Design interpretable diagnostics for failure modes.".to_string(),
            String::new(),
            "## Evidence excerpt".to_string(),
            evidence,
            String::new(),
        ];

        lines.join("\n")
    }
}

/// First `max` characters of `text` (char-boundary safe)
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("chunk number {}", i)).collect()
    }

    #[test]
    fn test_translation_caps_paragraphs() {
        let md = ArtifactBuilder::translation("Paper", "English", &chunks(12));
        assert!(md.starts_with("# Full Translation: Paper"));
        assert!(md.contains("## Paragraph 8"));
        assert!(!md.contains("## Paragraph 9"));
        assert!(md.ends_with('\n'));
    }

    #[test]
    fn test_translation_without_chunks() {
        let md = ArtifactBuilder::translation("Paper", "English", &[]);
        assert!(md.contains("## Paragraph 1"));
        assert!(md.contains("No usable text chunks"));
    }

    #[test]
    fn test_summary_starts_with_template() {
        let md = ArtifactBuilder::summary("Paper", "# Template\n\n## 1. Problem\n", &chunks(7));
        assert!(md.starts_with("# Template"));
        assert!(md.contains("- Key point 5: chunk number 5"));
        assert!(!md.contains("Key point 6"));
    }

    #[test]
    fn test_improvement_lists_tags_and_evidence() {
        let tags = vec!["LLM".to_string(), "NLP".to_string()];
        let md = ArtifactBuilder::improvement("Paper", &tags, &chunks(2));
        assert!(md.contains("Related domains: LLM, NLP"));
        assert!(md.contains("chunk number 1"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
