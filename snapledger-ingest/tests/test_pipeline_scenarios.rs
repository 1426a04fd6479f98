use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use snapledger_core::{
    Category, ExtractionError, PipelineError, RecordError, SinkError, TransactionRecord,
};
use snapledger_ingest::{
    Inference, NO_TRANSACTIONS_MESSAGE, Pipeline, RecordExtractor, RecordSink, TextExtractor,
    reply_text,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const TWO_RECEIPTS: &str = "Here you go:\n[{\"date\":\"2024-05-01\",\"merchant\":\"Cafe X\",\"amount\":\"12.50\",\"category\":\"Dining & Drinks\"},{\"date\":null,\"merchant\":\"Shop Y\",\"amount\":\"n/a\",\"category\":\"Misc\"}]";

struct FixedOcr(Option<&'static str>);

#[async_trait]
impl TextExtractor for FixedOcr {
    async fn extract_text(&self, _image: &Path) -> Result<String, ExtractionError> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| ExtractionError::Engine(anyhow!("tesseract exited with 1")))
    }
}

#[derive(Default)]
struct CountingModel {
    response: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Inference for CountingModel {
    fn name(&self) -> &str {
        "counting"
    }

    async fn infer(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.to_string())
    }
}

#[derive(Default)]
struct RecordingSink {
    fail: bool,
    batches: Mutex<Vec<Vec<TransactionRecord>>>,
}

#[async_trait]
impl RecordSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn append(&self, records: &[TransactionRecord]) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::from(anyhow!("quota exceeded")));
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

fn image() -> PathBuf {
    PathBuf::from("receipt.jpg")
}

fn pipeline(
    ocr: Option<&'static str>,
    model: Arc<CountingModel>,
    sink: Arc<RecordingSink>,
) -> Pipeline {
    Pipeline::new(
        Arc::new(FixedOcr(ocr)),
        RecordExtractor::new(model),
        sink,
    )
}

#[tokio::test]
async fn test_two_receipts_reach_sink_in_order() {
    let model = Arc::new(CountingModel {
        response: TWO_RECEIPTS,
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(Some("CAFE X\n12.50\nSHOP Y"), model.clone(), sink.clone());

    let outcome = p.process_image(&image()).await;
    let delivered = outcome.as_ref().unwrap();
    assert!(delivered.saved);

    let expected = vec![
        TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            merchant: Some("Cafe X".to_string()),
            amount: Some(12.5),
            category: Some(Category::DiningDrinks),
        },
        TransactionRecord {
            merchant: Some("Shop Y".to_string()),
            ..Default::default()
        },
    ];
    assert_eq!(delivered.records, expected);

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1, "one batch call");
    assert_eq!(batches[0], expected);

    let rows: Vec<_> = batches[0].iter().map(|r| r.to_row()).collect();
    assert_eq!(rows[0][2], serde_json::json!(12.5));
    assert_eq!(rows[1][0], serde_json::json!(""));

    let reply = reply_text(&outcome);
    let lines: Vec<&str> = reply.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("1. 2024-05-01 | Cafe X | 12.50"));
    assert!(lines[2].starts_with("2.  | Shop Y"));
}

#[tokio::test]
async fn test_prose_response_never_touches_sink() {
    let model = Arc::new(CountingModel {
        response: "Sorry, this does not look like a receipt.",
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(Some("blurry"), model, sink.clone());

    let outcome = p.process_image(&image()).await;
    assert!(matches!(
        outcome,
        Err(PipelineError::Records(RecordError::NoPayloadFound { .. }))
    ));
    assert!(sink.batches.lock().unwrap().is_empty());
    assert!(reply_text(&outcome).starts_with("Sorry"));
}

#[tokio::test]
async fn test_malformed_payload_never_touches_sink() {
    let model = Arc::new(CountingModel {
        response: "```json\n[{\"merchant\": \"A\" \"amount\": 1}]\n```",
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(Some("text"), model, sink.clone());

    let outcome = p.process_image(&image()).await;
    assert!(matches!(
        outcome,
        Err(PipelineError::Records(RecordError::MalformedPayload { .. }))
    ));
    assert!(sink.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_ocr_failure_skips_inference() {
    let model = Arc::new(CountingModel {
        response: TWO_RECEIPTS,
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(None, model.clone(), sink.clone());

    let outcome = p.process_image(&image()).await;
    assert!(matches!(outcome, Err(PipelineError::Extraction(ExtractionError::Engine(_)))));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(sink.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_ocr_text_is_extraction_error() {
    let model = Arc::new(CountingModel {
        response: TWO_RECEIPTS,
        ..Default::default()
    });
    let p = pipeline(Some("  \n\t "), model.clone(), Arc::new(RecordingSink::default()));

    let outcome = p.process_image(&image()).await;
    assert!(matches!(outcome, Err(PipelineError::Extraction(ExtractionError::NoText))));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sink_failure_reports_parsed_records() {
    let model = Arc::new(CountingModel {
        response: TWO_RECEIPTS,
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let p = pipeline(Some("text"), model, sink);

    let outcome = p.process_image(&image()).await;
    match &outcome {
        Err(PipelineError::Sink { records, .. }) => assert_eq!(records.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    let reply = reply_text(&outcome);
    assert!(reply.contains("parsed but not saved"));
    assert!(reply.contains("Cafe X"));
}

#[tokio::test]
async fn test_no_transactions_is_delivered_without_write() {
    let model = Arc::new(CountingModel {
        response: "[]",
        ..Default::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(Some("just a photo of a cat"), model, sink.clone());

    let outcome = p.process_image(&image()).await;
    let delivered = outcome.as_ref().unwrap();
    assert!(delivered.records.is_empty());
    assert!(!delivered.saved);
    assert!(sink.batches.lock().unwrap().is_empty());
    assert_eq!(reply_text(&outcome), NO_TRANSACTIONS_MESSAGE);
}

#[tokio::test]
async fn test_dry_run_skips_sink() {
    let model = Arc::new(CountingModel {
        response: TWO_RECEIPTS,
        ..Default::default()
    });
    let p = Pipeline::dry_run(Arc::new(FixedOcr(Some("text"))), RecordExtractor::new(model));

    let outcome = p.process_image(&image()).await;
    let reply = reply_text(&outcome);
    assert!(reply.starts_with("Extracted 2 transactions (not saved):"));

    let delivered = outcome.unwrap();
    assert_eq!(delivered.records.len(), 2);
    assert!(!delivered.saved);
}
