//! Record extraction: prompt → inference → payload → normalized records.

use std::sync::Arc;

use snapledger_core::{RecordError, TransactionRecord};
use tracing::debug;

use crate::payload::decode_payload;
use crate::prompt::build_prompt;
use crate::services::Inference;

pub struct RecordExtractor {
    inference: Arc<dyn Inference>,
}

impl RecordExtractor {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }

    /// Ask the model to structure `text` and normalize what comes back.
    pub async fn extract_records(&self, text: &str) -> Result<Vec<TransactionRecord>, RecordError> {
        let prompt = build_prompt(text);
        debug!(
            provider = self.inference.name(),
            prompt_len = prompt.len(),
            "requesting extraction"
        );

        let response = self
            .inference
            .infer(&prompt)
            .await
            .map_err(RecordError::InferenceFailed)?;
        debug!(response = %response, "model response");

        records_from_response(&response)
    }
}

/// Decode a raw model response into records, in response order.
///
/// Wholly empty objects are dropped; individual bad fields degrade to `None`.
pub fn records_from_response(response: &str) -> Result<Vec<TransactionRecord>, RecordError> {
    let objects = decode_payload(response)?;
    let total = objects.len();

    let records: Vec<TransactionRecord> = objects
        .iter()
        .filter_map(TransactionRecord::from_json)
        .collect();

    if records.len() < total {
        debug!(dropped = total - records.len(), "dropped empty entries");
    }
    Ok(records)
}
