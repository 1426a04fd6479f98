//! Per-image pipeline: OCR → record extraction → sink → reply text.
//!
//! Strictly sequential. Every failure ends the run for that image and is turned
//! into exactly one chat message by [`reply_text`].

use std::path::Path;
use std::sync::Arc;

use snapledger_core::{
    ExtractionError, PipelineError, TransactionRecord, format_summary, format_unsaved_summary,
};
use tracing::{debug, info, warn};

use crate::extractor::RecordExtractor;
use crate::services::{RecordSink, TextExtractor};

/// Message sent when the model found nothing to record.
pub const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found in that image.";

/// Terminal success state for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub records: Vec<TransactionRecord>,
    /// False when there was nothing to write or the sink was skipped.
    pub saved: bool,
}

impl Delivered {
    pub fn summary(&self) -> String {
        if self.records.is_empty() {
            NO_TRANSACTIONS_MESSAGE.to_string()
        } else if self.saved {
            format_summary(&self.records)
        } else {
            format_unsaved_summary(&self.records)
        }
    }
}

pub struct Pipeline {
    ocr: Arc<dyn TextExtractor>,
    extractor: RecordExtractor,
    sink: Option<Arc<dyn RecordSink>>,
}

impl Pipeline {
    pub fn new(
        ocr: Arc<dyn TextExtractor>,
        extractor: RecordExtractor,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            ocr,
            extractor,
            sink: Some(sink),
        }
    }

    /// A pipeline that extracts but never writes.
    pub fn dry_run(ocr: Arc<dyn TextExtractor>, extractor: RecordExtractor) -> Self {
        Self {
            ocr,
            extractor,
            sink: None,
        }
    }

    pub async fn process_image(&self, image: &Path) -> Result<Delivered, PipelineError> {
        let text = self.ocr.extract_text(image).await?;
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText.into());
        }
        debug!(chars = text.len(), text = %text, "OCR text");

        self.process_text(&text).await
    }

    /// Everything after OCR. Exposed for callers that already have text.
    pub async fn process_text(&self, text: &str) -> Result<Delivered, PipelineError> {
        let records = self.extractor.extract_records(text).await.inspect_err(|e| {
            if let Some(response) = e.response() {
                warn!(error = %e, response = %response, "could not interpret model response");
            }
        })?;
        info!(count = records.len(), "extracted records");

        if records.is_empty() {
            return Ok(Delivered {
                records,
                saved: false,
            });
        }

        let Some(sink) = &self.sink else {
            return Ok(Delivered {
                records,
                saved: false,
            });
        };

        match sink.append(&records).await {
            Ok(()) => {
                info!(sink = sink.name(), rows = records.len(), "appended rows");
                Ok(Delivered {
                    records,
                    saved: true,
                })
            }
            Err(source) => Err(PipelineError::Sink { records, source }),
        }
    }
}

/// The single chat reply for a finished run.
pub fn reply_text(outcome: &Result<Delivered, PipelineError>) -> String {
    match outcome {
        Ok(delivered) => delivered.summary(),
        Err(e) => e.user_message(),
    }
}
