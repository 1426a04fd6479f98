//! Seams for the external collaborators: OCR, inference and the spreadsheet sink.

use anyhow::Result;
use async_trait::async_trait;
use snapledger_core::{ExtractionError, SinkError, TransactionRecord};
use std::path::Path;

/// `text = OCR(image)`
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &Path) -> Result<String, ExtractionError>;
}

/// `response = Infer(prompt)`. The response is raw text with no format guarantees.
#[async_trait]
pub trait Inference: Send + Sync {
    fn name(&self) -> &str;
    async fn infer(&self, prompt: &str) -> Result<String>;
}

/// Append-only destination for records. All rows go in one batch, in order.
#[async_trait]
pub trait RecordSink: Send + Sync {
    fn name(&self) -> &str;
    async fn append(&self, records: &[TransactionRecord]) -> Result<(), SinkError>;
}
