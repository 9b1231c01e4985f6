use crate::{
    config::Config,
    extract::{self, ExtractionError},
    input::Image,
    llm::ListingGenerator,
    ocr::{self, TextExtractor},
    probe::{self, ImageProbe},
    record::ProductRecord,
};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Pipeline<E: TextExtractor, G: ListingGenerator> {
    cfg: Config,
    extractor: E,
    generator: G,
}

/// Everything observed while processing one image, success or not.
#[derive(Debug, Clone)]
pub struct ItemOutput {
    pub index: usize,
    pub source: String,
    pub probe: Option<ImageProbe>,
    pub ocr_text: Option<String>,
    pub response: Option<String>,
    pub outcome: Result<ProductRecord, ExtractionError>,
}

impl ItemOutput {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Default)]
struct Trace {
    probe: Option<ImageProbe>,
    ocr_text: Option<String>,
    response: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub index: usize,
    pub source: String,
    pub error: ExtractionError,
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Successful records in input order.
    pub records: Vec<ProductRecord>,
    /// Failures in input order, tagged with the originating index.
    pub failures: Vec<ItemFailure>,
    pub items: Vec<ItemOutput>,
}

impl BatchOutput {
    fn with_capacity(n: usize) -> Self {
        Self {
            records: Vec::with_capacity(n),
            failures: Vec::new(),
            items: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, item: ItemOutput) {
        match &item.outcome {
            Ok(record) => self.records.push(record.clone()),
            Err(error) => self.failures.push(ItemFailure {
                index: item.index,
                source: item.source.clone(),
                error: error.clone(),
            }),
        }
        self.items.push(item);
    }

    pub fn attempted(&self) -> usize {
        self.items.len()
    }
}

impl<E: TextExtractor, G: ListingGenerator> Pipeline<E, G> {
    pub fn new(cfg: &Config, extractor: E, generator: G) -> Self {
        Self {
            cfg: cfg.clone(),
            extractor,
            generator,
        }
    }

    /// OCR, generate, isolate and parse the listing for a single image.
    pub fn process(&self, image: &Image) -> Result<ProductRecord, ExtractionError> {
        self.process_item(0, image).outcome
    }

    pub fn process_item(&self, index: usize, image: &Image) -> ItemOutput {
        let mut trace = Trace::default();
        let outcome = self.process_traced(index, image, &mut trace);
        ItemOutput {
            index,
            source: image.source.clone(),
            probe: trace.probe,
            ocr_text: trace.ocr_text,
            response: trace.response,
            outcome,
        }
    }

    fn process_traced(
        &self,
        index: usize,
        image: &Image,
        trace: &mut Trace,
    ) -> Result<ProductRecord, ExtractionError> {
        if self.cfg.limits.probe_images {
            let p = probe::probe_image(&self.cfg, image)
                .map_err(|e| ExtractionError::ExtractionFailure(format!("{e:#}")))?;
            debug!(
                "item {} format={:?} {}x{} bytes={}",
                index, p.format, p.width, p.height, p.file_bytes
            );
            trace.probe = Some(p);
        }

        let text = ocr::extract_text(&self.extractor, image)
            .map_err(|e| ExtractionError::ExtractionFailure(format!("{e:#}")))?;
        if text.is_empty() {
            warn!("item {}: OCR found no text; sending empty input", index);
        }
        info!("item {} ocr chars={}", index, text.chars().count());

        let response = self.generator.generate(&text);
        trace.ocr_text = Some(text);
        let response =
            response.map_err(|e| ExtractionError::GenerationFailure(format!("{e:#}")))?;

        let parsed = extract::parse_listing(&response);
        trace.response = Some(response);
        parsed
    }

    /// Processes every image once, in order. Failures never stop the batch.
    pub fn run(&self, images: &[Image]) -> BatchOutput {
        let started = Instant::now();
        let batch = images
            .iter()
            .enumerate()
            .fold(BatchOutput::with_capacity(images.len()), |mut acc, (i, image)| {
                info!("item {} of {} source={}", i + 1, images.len(), image.source);
                let item = self.process_item(i, image);
                if let Err(err) = &item.outcome {
                    warn!(
                        "item {} ({}): could not extract listing [{}]: {}",
                        i,
                        item.source,
                        err.kind(),
                        err
                    );
                }
                acc.push(item);
                acc
            });

        info!(
            "batch done attempted={} ok={} failed={} elapsed_ms={}",
            batch.attempted(),
            batch.records.len(),
            batch.failures.len(),
            started.elapsed().as_millis()
        );
        batch
    }
}
