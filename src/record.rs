use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One parsed listing object, kept exactly as the model produced it.
///
/// No field is required and no type is checked; `nominal` offers a typed view
/// for callers that want one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord(Map<String, Value>);

impl ProductRecord {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn product_name(&self) -> Option<&str> {
        self.get_str("product_name")
    }

    pub fn price(&self) -> Option<&str> {
        self.get_str("price")
    }

    pub fn nominal(&self) -> Result<NominalListing> {
        NominalListing::deserialize(Value::Object(self.0.clone()))
            .with_context(|| "record does not match the nominal listing schema")
    }
}

/// Typed view of the listing schema the system prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NominalListing {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub shipping: Option<String>,
    #[serde(default)]
    pub shop_link: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub manufacture_date: Option<String>,
    #[serde(default)]
    pub use_by: Option<String>,
    #[serde(default)]
    pub nutrition_info: Option<BTreeMap<String, String>>,
}

/// Batch export document: a pretty-printed JSON array of records.
pub fn export_json(records: &[ProductRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).with_context(|| "serializing product listings")
}

pub fn import_json(raw: &str) -> Result<Vec<ProductRecord>> {
    serde_json::from_str(raw).with_context(|| "parsing product listings")
}
