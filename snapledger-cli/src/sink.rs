use anyhow::{Context, Result};
use async_trait::async_trait;
use snapledger_core::{RECORD_KEYS, Row, SinkError, TransactionRecord, cell_text};
use snapledger_ingest::RecordSink;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{Config, SinkKind};

/// Build the configured sink. Google Sheets authenticates here, once.
pub async fn build_sink(cfg: &Config) -> Result<Arc<dyn RecordSink>> {
    cfg.validate_sink()?;
    match cfg.sink.kind {
        SinkKind::Csv => Ok(Arc::new(CsvSink::new(cfg.sink.csv_path.clone()))),
        SinkKind::GoogleSheets => google_sheets_sink(cfg).await,
    }
}

#[cfg(feature = "gsheets")]
async fn google_sheets_sink(cfg: &Config) -> Result<Arc<dyn RecordSink>> {
    let sink = crate::google_sheets::GoogleSheetsSink::connect(&cfg.sink).await?;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "gsheets"))]
async fn google_sheets_sink(_cfg: &Config) -> Result<Arc<dyn RecordSink>> {
    anyhow::bail!(
        "built without the gsheets feature; \
         set sink.kind = \"csv\" or rebuild with --features gsheets"
    )
}

/// Appends rows to a local CSV file, writing the header when the file is new.
pub struct CsvSink {
    path: PathBuf,
    // one writer at a time; rows from two batches must not interleave
    lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }
}

fn append_rows(path: &Path, rows: &[Row]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let is_new = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if is_new {
        wtr.write_record(RECORD_KEYS)?;
    }
    for row in rows {
        wtr.write_record(row.iter().map(cell_text))?;
    }
    wtr.flush().with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl RecordSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn append(&self, records: &[TransactionRecord]) -> Result<(), SinkError> {
        let rows: Vec<Row> = records.iter().map(TransactionRecord::to_row).collect();
        let path = self.path.clone();

        let _guard = self.lock.lock().await;
        tokio::task::spawn_blocking(move || append_rows(&path, &rows))
            .await
            .context("csv writer task")??;
        Ok(())
    }
}
