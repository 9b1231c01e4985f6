use crate::{
    pipeline::{BatchOutput, ItemOutput},
    probe::ImageProbe,
    record::ProductRecord,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_name: String,
    pub model: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub index: usize,
    pub source: String,
    pub ok: bool,
    pub probe: Option<ImageProbe>,
    pub ocr_chars: Option<usize>,
    pub product_name: Option<String>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl ItemReport {
    pub fn from_item(item: &ItemOutput) -> Self {
        let (product_name, error_kind, error) = match &item.outcome {
            Ok(record) => (record.product_name().map(str::to_string), None, None),
            Err(err) => (None, Some(err.kind().to_string()), Some(err.to_string())),
        };
        Self {
            index: item.index,
            source: item.source.clone(),
            ok: item.is_ok(),
            probe: item.probe.clone(),
            ocr_chars: item.ocr_text.as_ref().map(|t| t.chars().count()),
            product_name,
            error_kind,
            error,
        }
    }
}

impl JobReport {
    pub fn from_batch(job_name: &str, model: &str, batch: &BatchOutput) -> Self {
        Self {
            job_name: job_name.to_string(),
            model: model.to_string(),
            attempted: batch.attempted(),
            succeeded: batch.records.len(),
            failed: batch.failures.len(),
            items: batch.items.iter().map(ItemReport::from_item).collect(),
        }
    }
}

/// Per-image trace written to `items/item_NNNNN.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDump {
    pub index: usize,
    pub source: String,
    pub ocr_text: Option<String>,
    pub response: Option<String>,
    pub record: Option<ProductRecord>,
    pub error: Option<String>,
}

impl ItemDump {
    pub fn from_item(item: &ItemOutput, keep_response: bool) -> Self {
        Self {
            index: item.index,
            source: item.source.clone(),
            ocr_text: item.ocr_text.clone(),
            response: if keep_response { item.response.clone() } else { None },
            record: item.outcome.as_ref().ok().cloned(),
            error: item.outcome.as_ref().err().map(ToString::to_string),
        }
    }
}
