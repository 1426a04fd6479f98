//! Error taxonomy for the receipt pipeline.

use thiserror::Error;

use crate::record::TransactionRecord;
use crate::summary::summary_lines;

/// OCR failed or produced nothing usable.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("OCR engine failed: {0}")]
    Engine(#[source] anyhow::Error),

    #[error("OCR produced no usable text")]
    NoText,
}

/// The model response could not be turned into records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("inference request failed: {0}")]
    InferenceFailed(#[source] anyhow::Error),

    #[error("no JSON array found in model response")]
    NoPayloadFound { response: String },

    #[error("model response is not a JSON array of objects: {source}")]
    MalformedPayload {
        response: String,
        source: serde_json::Error,
    },
}

impl RecordError {
    /// Raw model output, when there was one.
    pub fn response(&self) -> Option<&str> {
        match self {
            RecordError::InferenceFailed(_) => None,
            RecordError::NoPayloadFound { response }
            | RecordError::MalformedPayload { response, .. } => Some(response),
        }
    }
}

/// Appending to the sink failed. The batch is not retried.
#[derive(Debug, Error)]
#[error("sink append failed: {0}")]
pub struct SinkError(#[from] anyhow::Error);

/// Anything that ends processing of one image.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image download failed: {0}")]
    Download(#[source] anyhow::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Records(#[from] RecordError),

    #[error("{source}")]
    Sink {
        records: Vec<TransactionRecord>,
        source: SinkError,
    },
}

impl PipelineError {
    /// The single chat message sent back for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Download(_) => "Sorry, I couldn't download that image.".to_string(),
            PipelineError::Extraction(_) => {
                "Sorry, I couldn't read any text from that image.".to_string()
            }
            PipelineError::Records(RecordError::InferenceFailed(_)) => {
                "Sorry, the extraction service is unavailable right now. Please resend the image later."
                    .to_string()
            }
            PipelineError::Records(_) => {
                "Sorry, I couldn't extract transactions from that image.".to_string()
            }
            PipelineError::Sink { records, .. } => {
                let mut msg = format!(
                    "The data was parsed but not saved to the spreadsheet ({} transaction(s)). Please resend the image.",
                    records.len()
                );
                for line in summary_lines(records) {
                    msg.push('\n');
                    msg.push_str(&line);
                }
                msg
            }
        }
    }
}
