/// Borrowed view of the two encoded specimens handed to a provider. The
/// questioned document comes first; roles are not interchangeable.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub questioned_png: &'a [u8],
    pub known_png: &'a [u8],
}

impl<'a> AnalysisRequest<'a> {
    pub fn new(questioned_png: &'a [u8], known_png: &'a [u8]) -> Self {
        Self {
            questioned_png,
            known_png,
        }
    }
}
