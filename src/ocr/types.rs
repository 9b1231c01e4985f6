use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrDiag {
    pub python_exe: String,
    pub python_version: String,
    pub paddleocr_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrIn {
    pub image_base64: String,
    pub lang: String,
    pub use_angle_cls: bool,
    pub cls: bool,
}

/// One recognized text box. `bbox` holds the four corner points when the
/// runner reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub bbox: Vec<[f32; 2]>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
            bbox: Vec::new(),
        }
    }
}

/// Fragments grouped the way the engine reports them (one group per page/line block).
pub type TextGroup = Vec<TextFragment>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOut {
    pub ok: bool,
    #[serde(default)]
    pub groups: Vec<TextGroup>,
    #[serde(default)]
    pub error: Option<String>,
}
