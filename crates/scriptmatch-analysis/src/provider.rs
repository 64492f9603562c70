use futures_util::future::BoxFuture;

use crate::error::AnalysisError;
use crate::request::AnalysisRequest;
use crate::response::AnalysisReport;

/// Common interface for AI analysis backends.
pub trait AnalysisProvider: Send + Sync {
    /// Stable provider name used for reporting and diagnostics.
    fn name(&self) -> &'static str;

    fn analyze<'a>(
        &'a self,
        request: AnalysisRequest<'a>,
    ) -> BoxFuture<'a, Result<AnalysisReport, AnalysisError>>;
}

/// Placeholder provider for tests and offline runs.
#[derive(Debug, Default)]
pub struct NoopAnalysisProvider;

impl AnalysisProvider for NoopAnalysisProvider {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn analyze<'a>(
        &'a self,
        _: AnalysisRequest<'a>,
    ) -> BoxFuture<'a, Result<AnalysisReport, AnalysisError>> {
        Box::pin(async {
            Ok(AnalysisReport {
                score: None,
                text: String::new(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_provider_returns_an_empty_report() {
        let provider = NoopAnalysisProvider;
        let request = AnalysisRequest::new(b"a", b"b");
        let report = futures_util::future::FutureExt::now_or_never(provider.analyze(request))
            .expect("noop resolves immediately")
            .unwrap();
        assert!(report.score.is_none());
        assert!(report.text.is_empty());
    }
}
