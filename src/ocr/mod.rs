pub mod python;
pub mod types;

use crate::input::Image;
use anyhow::Result;

pub use types::{OcrDiag, OcrIn, OcrOut, TextFragment, TextGroup};

pub trait TextExtractor {
    /// Recognize text in `image`, preserving the engine's reported order.
    fn extract(&self, image: &Image) -> Result<Vec<TextGroup>>;
}

/// Space-joins every fragment in reported order. No normalization or dedup.
pub fn flatten_text(groups: &[TextGroup]) -> String {
    groups
        .iter()
        .flatten()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn extract_text(extractor: &dyn TextExtractor, image: &Image) -> Result<String> {
    let groups = extractor.extract(image)?;
    Ok(flatten_text(&groups))
}
