/// Free-text opinion from a provider, with an optional numeric score parsed
/// out of the reply.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// 0..=100 when the reply carried a parseable similarity line.
    pub score: Option<f32>,
    pub text: String,
}

impl AnalysisReport {
    pub fn from_text(text: String) -> Self {
        let score = parse_similarity_score(&text);
        Self { score, text }
    }
}

/// Extracts the first `SIMILARITY_SCORE: <n>` line from a provider reply.
/// Providers are prompted to emit one, but a missing or garbled line just
/// downgrades the opinion to advisory text.
pub fn parse_similarity_score(text: &str) -> Option<f32> {
    const MARKER: &str = "SIMILARITY_SCORE:";
    let start = text.find(MARKER)? + MARKER.len();
    let line = text[start..].lines().next()?;
    let digits: String = line
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: f32 = digits.parse().ok()?;
    Some(value.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_score_line() {
        let text = "CONFIDENCE: HIGH\nSIMILARITY_SCORE: 78\nDETAILED_ANALYSIS: ...";
        assert_eq!(parse_similarity_score(text), Some(78.0));
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(parse_similarity_score("SIMILARITY_SCORE: 400"), Some(100.0));
    }

    #[test]
    fn missing_or_garbled_lines_yield_none() {
        assert_eq!(parse_similarity_score("no score here"), None);
        assert_eq!(parse_similarity_score("SIMILARITY_SCORE: high"), None);
    }

    #[test]
    fn report_carries_both_score_and_text() {
        let report = AnalysisReport::from_text("SIMILARITY_SCORE: 55\nLooks similar.".to_string());
        assert_eq!(report.score, Some(55.0));
        assert!(report.text.contains("Looks similar"));
    }
}
