//! Orchestrates the deterministic engine with the optional AI enrichment.
//! The engine result is complete before the provider is consulted; a slow,
//! failing, or absent provider can only ever add to it.

use std::time::Duration;

use scriptmatch_analysis::{AnalysisProvider, AnalysisRequest};
use scriptmatch_engine::ComparisonEngine;
use scriptmatch_types::{CompareResult, CompositeResult, SubScore, AI_DEEP_ANALYSIS};

/// Runs a full comparison, then layers the provider's opinion on top. The
/// provider call is bounded by `timeout`; any failure becomes a soft warning
/// on the result instead of an error.
pub async fn run_comparison(
    engine: &ComparisonEngine,
    provider: Option<&dyn AnalysisProvider>,
    questioned: &[u8],
    known: &[u8],
    timeout: Duration,
) -> CompareResult<CompositeResult> {
    let mut result = engine.compare(questioned, known)?;
    let Some(provider) = provider else {
        return Ok(result);
    };

    let request = AnalysisRequest::new(questioned, known);
    match tokio::time::timeout(timeout, provider.analyze(request)).await {
        Ok(Ok(report)) => {
            if !report.text.is_empty() {
                result.ai_analysis = Some(report.text);
            }
            if let Some(score) = report.score {
                result.sub_scores.push(SubScore::new(
                    AI_DEEP_ANALYSIS,
                    score,
                    format!("{} forensic opinion", provider.name()),
                ));
                if engine.config().score.include_ai {
                    let (composite, verdict) = engine.rescore(&result.sub_scores)?;
                    result.composite_score = composite;
                    result.verdict = verdict;
                    result.verdict_color = verdict.color();
                }
            }
        }
        Ok(Err(err)) => {
            result.ai_warning = Some(err.to_string());
        }
        Err(_) => {
            result.ai_warning = Some(format!(
                "analysis timed out after {}s",
                timeout.as_secs()
            ));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use futures_util::future::BoxFuture;
    use scriptmatch_analysis::{AnalysisError, AnalysisReport, NoopAnalysisProvider};
    use scriptmatch_engine::{EngineConfig, PreprocessSettings};
    use scriptmatch_types::Verdict;

    use super::*;

    struct FixedProvider {
        score: f32,
    }

    impl AnalysisProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn analyze<'a>(
            &'a self,
            _: AnalysisRequest<'a>,
        ) -> BoxFuture<'a, Result<AnalysisReport, AnalysisError>> {
            Box::pin(async move {
                Ok(AnalysisReport {
                    score: Some(self.score),
                    text: format!("SIMILARITY_SCORE: {}\nfixture opinion", self.score),
                })
            })
        }
    }

    struct FailingProvider;

    impl AnalysisProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn analyze<'a>(
            &'a self,
            _: AnalysisRequest<'a>,
        ) -> BoxFuture<'a, Result<AnalysisReport, AnalysisError>> {
            Box::pin(async { Err(AnalysisError::MissingCredentials) })
        }
    }

    fn test_engine(include_ai: bool) -> ComparisonEngine {
        let mut config = EngineConfig {
            preprocess: PreprocessSettings {
                canonical_edge: 128,
                ..PreprocessSettings::default()
            },
            ..EngineConfig::default()
        };
        config.score.include_ai = include_ai;
        ComparisonEngine::new(config).unwrap()
    }

    fn specimen_png() -> Vec<u8> {
        use image::ImageEncoder;

        let mut image = image::GrayImage::from_pixel(128, 96, image::Luma([255]));
        for y in 20..60 {
            for x in 20..26 {
                image.put_pixel(x, y, image::Luma([20]));
                image.put_pixel(x + 40, y, image::Luma([20]));
            }
        }
        let mut encoded = Vec::new();
        image::codecs::png::PngEncoder::new(&mut encoded)
            .write_image(image.as_raw(), 128, 96, image::ColorType::L8)
            .unwrap();
        encoded
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_a_warning() {
        let engine = test_engine(false);
        let bytes = specimen_png();
        let result = run_comparison(
            &engine,
            Some(&FailingProvider),
            &bytes,
            &bytes,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(result.ai_warning.is_some());
        assert!(result.ai_analysis.is_none());
        assert_eq!(result.verdict, Verdict::MatchLikely);
    }

    #[tokio::test]
    async fn advisory_opinion_never_moves_the_composite() {
        let engine = test_engine(false);
        let bytes = specimen_png();
        let without = run_comparison(&engine, None, &bytes, &bytes, Duration::from_secs(5))
            .await
            .unwrap();
        let with = run_comparison(
            &engine,
            Some(&FixedProvider { score: 5.0 }),
            &bytes,
            &bytes,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(without.composite_score.to_bits(), with.composite_score.to_bits());
        assert_eq!(with.sub_scores.last().unwrap().name, AI_DEEP_ANALYSIS);
        assert!(with.ai_analysis.is_some());
    }

    #[tokio::test]
    async fn weighted_opinion_shifts_the_composite() {
        let engine = test_engine(true);
        let bytes = specimen_png();
        let result = run_comparison(
            &engine,
            Some(&FixedProvider { score: 0.0 }),
            &bytes,
            &bytes,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        // Identical specimens score ~100 deterministically; a zero opinion
        // weighted at 0.35 drags the fused score to ~65.
        assert!(result.composite_score < 70.0, "got {}", result.composite_score);
    }

    #[tokio::test]
    async fn noop_provider_adds_nothing() {
        let engine = test_engine(false);
        let bytes = specimen_png();
        let result = run_comparison(
            &engine,
            Some(&NoopAnalysisProvider),
            &bytes,
            &bytes,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(result.ai_analysis.is_none());
        assert!(result.ai_warning.is_none());
        assert_eq!(result.sub_scores.len(), 5);
    }
}
