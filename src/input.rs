use anyhow::{Context, Result};
use std::path::Path;

/// One product photo as supplied by the caller.
///
/// The buffer is opaque to the pipeline; an image has no identity beyond its
/// position in the batch. `source` is only carried for logs and reports.
#[derive(Debug, Clone)]
pub struct Image {
    pub source: String,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading image: {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
