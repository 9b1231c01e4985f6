pub mod cli;
pub mod config;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod probe;
pub mod record;
pub mod render;
pub mod report;
pub mod util;
