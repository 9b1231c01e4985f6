use product_lister::{
    config::Config,
    extract::{ExtractionError, parse_listing},
    pipeline::ItemOutput,
    render::{clean_text, render_markdown},
};

fn ok_item() -> ItemOutput {
    let response = "📦 Rolled Oats  \n💰 Price: ₹120  \n{\"product_name\": \"Rolled Oats\"}";
    ItemOutput {
        index: 0,
        source: "oats.jpg".into(),
        probe: None,
        ocr_text: Some("ROLLED OATS 500g".into()),
        response: Some(response.into()),
        outcome: parse_listing(response),
    }
}

fn failed_item() -> ItemOutput {
    ItemOutput {
        index: 1,
        source: "blurry.jpg".into(),
        probe: None,
        ocr_text: Some("".into()),
        response: Some("I could not find a product.".into()),
        outcome: Err(ExtractionError::NoJsonFound),
    }
}

#[test]
fn markdown_shows_listing_without_json_block() {
    let md = render_markdown(&Config::default(), &[ok_item(), failed_item()]);
    assert!(md.contains("## Image 1: oats.jpg"));
    assert!(md.contains("**OCR Result:** ROLLED OATS 500g"));
    assert!(md.contains("📦 Rolled Oats  \n💰 Price: ₹120"));
    assert!(!md.contains("\"product_name\""));
    assert!(md.contains("\n---\n"));
}

#[test]
fn markdown_carries_a_warning_per_failed_item() {
    let md = render_markdown(&Config::default(), &[ok_item(), failed_item()]);
    assert_eq!(md.matches("Could not extract JSON").count(), 1);
    assert!(md.contains("## Image 2: blurry.jpg"));
    assert!(md.contains("I could not find a product."));
    assert!(md.contains("no JSON object found"));
}

#[test]
fn clean_text_strips_control_chars_but_keeps_layout() {
    let cfg = Config::default();
    let cleaned = clean_text(&cfg, "Alpha\u{0002}Beta\r\nLine\tTabbed  \nNext");
    assert!(!cleaned.contains('\u{0002}'));
    assert!(cleaned.contains("AlphaBeta"));
    assert!(cleaned.contains('\t'));
    assert!(!cleaned.contains('\r'));
    assert!(cleaned.contains("Tabbed  \n"), "markdown hard breaks survive by default");
}

#[test]
fn optional_unicode_and_whitespace_normalization() {
    let mut cfg = Config::default();
    cfg.render.normalize_unicode = true;
    cfg.render.trim_trailing_whitespace = true;
    let cleaned = clean_text(&cfg, "ﬁne  \nＰrice");
    assert_eq!(cleaned, "fine\nPrice\n");
}
