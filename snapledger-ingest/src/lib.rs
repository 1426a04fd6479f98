//! snapledger-ingest: turns OCR text into validated transaction records and
//! drives the per-image pipeline through the collaborator traits.

pub mod extractor;
pub mod payload;
pub mod pipeline;
pub mod prompt;
pub mod services;

pub use extractor::{RecordExtractor, records_from_response};
pub use payload::{decode_payload, locate_payload};
pub use pipeline::{Delivered, NO_TRANSACTIONS_MESSAGE, Pipeline, reply_text};
pub use prompt::build_prompt;
pub use services::{Inference, RecordSink, TextExtractor};
