//! snapledger-core: record types, field coercion, summaries and the error taxonomy

pub mod category;
pub mod coerce;
pub mod error;
pub mod record;
pub mod summary;

pub use category::Category;
pub use error::{ExtractionError, PipelineError, RecordError, SinkError};
pub use record::{RECORD_KEYS, Row, TransactionRecord, cell_text};
pub use summary::{
    format_summary, format_unsaved_summary, summary_header, summary_lines, unsaved_header,
};
