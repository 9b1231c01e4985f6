use anyhow::{Result, anyhow};
use product_lister::{
    config::Config,
    extract::ExtractionError,
    input::Image,
    llm::ListingGenerator,
    ocr::{TextExtractor, TextFragment, TextGroup},
    pipeline::Pipeline,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Returns fixed fragments keyed on the image bytes; `b"unreadable"` fails.
#[derive(Default)]
struct FakeOcr {
    calls: Rc<Cell<usize>>,
}

impl TextExtractor for FakeOcr {
    fn extract(&self, image: &Image) -> Result<Vec<TextGroup>> {
        self.calls.set(self.calls.get() + 1);
        if image.bytes == b"unreadable" {
            return Err(anyhow!("cannot identify image file"));
        }
        let text = String::from_utf8_lossy(&image.bytes).to_string();
        Ok(vec![text.split(' ').map(TextFragment::new).collect()])
    }
}

/// Echoes OCR text into a canned reply shape chosen by its first word.
#[derive(Default)]
struct FakeLlm {
    seen: Rc<RefCell<Vec<String>>>,
}

impl ListingGenerator for FakeLlm {
    fn generate(&self, text: &str) -> Result<String> {
        self.seen.borrow_mut().push(text.to_string());
        let name = text.split(' ').nth(1).unwrap_or_default();
        match text.split(' ').next() {
            Some("good") => Ok(format!(
                "📦 {name}\n💰 Price: ₹10\n{{\"product_name\": \"{name}\", \"price\": \"₹10\"}}"
            )),
            Some("prose") => Ok(format!("📦 {name} with no json at all")),
            Some("broken") => Ok(format!("📦 {name} {{\"product_name\": \"{name}\"}} extra {{x}}")),
            Some("offline") => Err(anyhow!("connection refused")),
            _ => Ok(String::new()),
        }
    }
}

fn cfg() -> Config {
    let mut cfg = Config::default();
    cfg.limits.probe_images = false;
    cfg
}

fn pipeline() -> Pipeline<FakeOcr, FakeLlm> {
    Pipeline::new(&cfg(), FakeOcr::default(), FakeLlm::default())
}

fn img(i: usize, text: &str) -> Image {
    Image::new(format!("img{i}.png"), text.as_bytes().to_vec())
}

#[test]
fn successes_keep_input_order_and_failures_keep_index() {
    let p = pipeline();
    let images = vec![
        img(0, "good Alpha"),
        img(1, "prose Beta"),
        img(2, "good Gamma"),
    ];
    let batch = p.run(&images);

    let names: Vec<_> = batch.records.iter().map(|r| r.product_name().unwrap()).collect();
    assert_eq!(names, vec!["Alpha", "Gamma"]);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].index, 1);
    assert_eq!(batch.failures[0].source, "img1.png");
    assert_eq!(batch.failures[0].error, ExtractionError::NoJsonFound);
}

#[test]
fn every_image_is_attempted_once_even_when_all_fail() {
    let images = vec![
        img(0, "unreadable"),
        img(1, "broken X"),
        img(2, "offline Y"),
        img(3, "prose Z"),
    ];

    let p = pipeline();
    let batch = p.run(&images);

    assert_eq!(batch.attempted(), 4);
    assert!(batch.records.is_empty());
    let kinds: Vec<_> = batch.failures.iter().map(|f| (f.index, f.error.kind())).collect();
    assert_eq!(
        kinds,
        vec![
            (0, "extraction_failure"),
            (1, "invalid_json"),
            (2, "generation_failure"),
            (3, "no_json_found"),
        ]
    );
}

#[test]
fn extractor_failure_skips_generation() {
    let llm = FakeLlm::default();
    let seen = Rc::clone(&llm.seen);
    let p = Pipeline::new(&cfg(), FakeOcr::default(), llm);
    let batch = p.run(&[img(0, "unreadable"), img(1, "good Kept")]);

    assert_eq!(batch.records.len(), 1);
    assert_eq!(*seen.borrow(), vec!["good Kept".to_string()]);
    assert!(batch.items[0].ocr_text.is_none());
    assert!(batch.items[0].response.is_none());
    match &batch.failures[0].error {
        ExtractionError::ExtractionFailure(msg) => assert!(msg.contains("cannot identify")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn fragments_are_space_joined_before_generation() {
    let llm = FakeLlm::default();
    let seen = Rc::clone(&llm.seen);
    let p = Pipeline::new(&cfg(), FakeOcr::default(), llm);
    let record = p.process(&img(0, "good Solo extra words")).expect("record");
    assert_eq!(record.product_name(), Some("Solo"));
    assert_eq!(seen.borrow()[0], "good Solo extra words");
}

#[test]
fn invocation_counts_match_batch_size() {
    let ocr = FakeOcr::default();
    let ocr_calls = Rc::clone(&ocr.calls);
    let llm = FakeLlm::default();
    let seen = Rc::clone(&llm.seen);
    let p = Pipeline::new(&cfg(), ocr, llm);
    let images: Vec<_> = (0..7)
        .map(|i| img(i, if i % 2 == 0 { "good N" } else { "prose N" }))
        .collect();
    let batch = p.run(&images);
    assert_eq!(batch.attempted(), 7);
    assert_eq!(ocr_calls.get(), 7);
    assert_eq!(seen.borrow().len(), 7);
    assert_eq!(batch.records.len(), 4);
    assert_eq!(batch.failures.len(), 3);
}

#[test]
fn rerun_with_deterministic_fakes_is_identical() {
    let p = pipeline();
    let images = vec![
        img(0, "good A"),
        img(1, "broken B"),
        img(2, "good C"),
        img(3, "offline D"),
    ];
    let first = p.run(&images);
    let second = p.run(&images);
    assert_eq!(first.records, second.records);
    assert_eq!(first.failures, second.failures);
}

#[test]
fn empty_batch_yields_empty_result() {
    let batch = pipeline().run(&[]);
    assert_eq!(batch.attempted(), 0);
    assert!(batch.records.is_empty());
    assert!(batch.failures.is_empty());
}

#[test]
fn probe_failure_is_an_item_level_extraction_failure() {
    let mut cfg = Config::default();
    cfg.limits.probe_images = true;
    let ocr = FakeOcr::default();
    let ocr_calls = Rc::clone(&ocr.calls);
    let p = Pipeline::new(&cfg, ocr, FakeLlm::default());
    let batch = p.run(&[img(0, "good NotAnImage")]);
    assert_eq!(batch.attempted(), 1);
    assert_eq!(batch.failures[0].error.kind(), "extraction_failure");
    assert_eq!(ocr_calls.get(), 0);
}
