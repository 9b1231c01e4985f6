use crate::{config::Config, input::Image};
use anyhow::{Context, Result};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageProbe {
    pub source: String,
    pub file_bytes: u64,
    pub format: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// Header-only inspection; the pixels are left for the OCR engine to decode.
pub fn probe_image(cfg: &Config, image: &Image) -> Result<ImageProbe> {
    let file_bytes = image.len() as u64;
    if file_bytes == 0 {
        anyhow::bail!("image is empty");
    }
    if file_bytes > cfg.limits.max_input_file_bytes {
        anyhow::bail!("image exceeds max_input_file_bytes: {}", file_bytes);
    }

    let reader = ImageReader::new(Cursor::new(image.bytes.as_slice()))
        .with_guessed_format()
        .with_context(|| "guessing image format")?;
    let format = reader.format().map(|f| format!("{f:?}").to_ascii_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .with_context(|| "reading image dimensions")?;

    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 {
        anyhow::bail!("image has zero pixels");
    }
    if pixels > cfg.limits.max_image_pixels {
        anyhow::bail!("image exceeds max_image_pixels: {}x{}", width, height);
    }

    Ok(ImageProbe {
        source: image.source.clone(),
        file_bytes,
        format,
        width,
        height,
    })
}
