use crate::{config::Config, extract, pipeline::ItemOutput};
use std::fmt::Write as _;
use unicode_normalization::UnicodeNormalization;

/// Markdown view of a processed batch: per item the OCR text, the
/// human-readable listing and, for failures, the warning that was raised.
pub fn render_markdown(cfg: &Config, items: &[ItemOutput]) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Product listings ({})\n", cfg.global.job_name);

    for (n, item) in items.iter().enumerate() {
        if n > 0 {
            md.push_str("\n---\n\n");
        }
        let _ = writeln!(md, "## Image {}: {}\n", item.index + 1, item.source);

        if let Some(p) = &item.probe {
            let fmt = p.format.as_deref().unwrap_or("unknown");
            let _ = writeln!(md, "_{} {}x{}, {} bytes_\n", fmt, p.width, p.height, p.file_bytes);
        }

        if let Some(text) = &item.ocr_text {
            let _ = writeln!(md, "**OCR Result:** {}\n", text);
        }

        if let Some(response) = &item.response {
            let listing = extract::listing_text(response);
            if !listing.is_empty() {
                md.push_str(listing);
                md.push_str("\n\n");
            }
        }

        if let Err(err) = &item.outcome {
            let _ = writeln!(
                md,
                "> ⚠️ Could not extract JSON for this product. Error: {}",
                err
            );
        }
    }

    clean_text(cfg, &md)
}

pub fn clean_text(cfg: &Config, s: &str) -> String {
    let mut out = s.to_string();

    if cfg.render.normalize_newlines {
        out = out.replace("\r\n", "\n");
    }

    if cfg.render.normalize_unicode {
        out = out.nfkc().collect::<String>();
    }

    out = sanitize_control_chars(&out, &cfg.render.control_chars_to_sanitize);

    if cfg.render.trim_trailing_whitespace {
        out = out
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
    }

    out
}

fn sanitize_control_chars(s: &str, codes: &[u8]) -> String {
    if codes.is_empty() {
        return s.to_string();
    }

    let mut mask = [false; 128];
    for &code in codes {
        if let Some(slot) = mask.get_mut(code as usize) {
            *slot = true;
        }
    }

    s.chars()
        .filter(|&ch| {
            if matches!(ch, '\n' | '\r' | '\t') {
                return true;
            }
            let cp = ch as u32;
            cp >= 128 || !mask[cp as usize]
        })
        .collect()
}
