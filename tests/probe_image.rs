use image::{ImageFormat, RgbImage};
use product_lister::{config::Config, input::Image, probe::probe_image};
use std::io::Cursor;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::new(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

#[test]
fn reads_format_and_dimensions() {
    let cfg = Config::default();
    let image = Image::new("label.png", png(12, 7));
    let probe = probe_image(&cfg, &image).expect("probe");
    assert_eq!(probe.format.as_deref(), Some("png"));
    assert_eq!((probe.width, probe.height), (12, 7));
    assert_eq!(probe.file_bytes, image.len() as u64);
    assert_eq!(probe.source, "label.png");
}

#[test]
fn rejects_oversized_images() {
    let mut cfg = Config::default();
    cfg.limits.max_image_pixels = 50;
    let err = probe_image(&cfg, &Image::new("big.png", png(10, 10))).unwrap_err();
    assert!(err.to_string().contains("max_image_pixels"));

    let mut cfg = Config::default();
    cfg.limits.max_input_file_bytes = 8;
    let err = probe_image(&cfg, &Image::new("big.png", png(10, 10))).unwrap_err();
    assert!(err.to_string().contains("max_input_file_bytes"));
}

#[test]
fn rejects_empty_and_undecodable_buffers() {
    let cfg = Config::default();
    assert!(probe_image(&cfg, &Image::new("empty.png", Vec::new())).is_err());
    assert!(probe_image(&cfg, &Image::new("notes.png", b"not an image".to_vec())).is_err());
}
