use anyhow::{Context, Result};
use async_trait::async_trait;
use google_sheets4::Sheets;
use google_sheets4::api::ValueRange;
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use snapledger_core::{Row, SinkError, TransactionRecord};
use snapledger_ingest::RecordSink;
use tracing::{debug, info};

use crate::config::SinkSection;

// IMPORTANT: use the oauth2 version re-exported by google-sheets4 to avoid version mismatches.
use google_sheets4::oauth2;

/// `spreadsheets.values.append` into one sheet range, authenticated as a service account.
pub struct GoogleSheetsSink {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    sheet_id: String,
    range: String,
    value_input_option: String,
}

impl GoogleSheetsSink {
    pub async fn connect(cfg: &SinkSection) -> Result<Self> {
        let sheet_id = cfg
            .sheet_id
            .clone()
            .context("missing spreadsheet id; set GOOGLE_SHEET_ID")?;

        let key = oauth2::read_service_account_key(&cfg.credentials_path)
            .await
            .with_context(|| {
                format!("read service account key {}", cfg.credentials_path.display())
            })?;
        info!(client_email = %key.client_email, "authenticating to Google Sheets");

        let auth = oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("building service account authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let hub = Sheets::new(hyper::Client::builder().build(connector), auth);

        Ok(Self {
            hub,
            sheet_id,
            range: cfg.range.clone(),
            value_input_option: cfg.value_input_option.clone(),
        })
    }
}

pub fn value_range(records: &[TransactionRecord]) -> ValueRange {
    let rows: Vec<Row> = records.iter().map(TransactionRecord::to_row).collect();
    ValueRange {
        values: Some(rows),
        ..Default::default()
    }
}

#[async_trait]
impl RecordSink for GoogleSheetsSink {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn append(&self, records: &[TransactionRecord]) -> Result<(), SinkError> {
        let req = value_range(records);
        debug!(sheet = %self.sheet_id, range = %self.range, rows = records.len(), "values.append");

        let (_, resp) = self
            .hub
            .spreadsheets()
            .values_append(req, &self.sheet_id, &self.range)
            .value_input_option(&self.value_input_option)
            .insert_data_option("INSERT_ROWS")
            .doit()
            .await
            .with_context(|| format!("appending {} row(s) to {}", records.len(), self.range))?;

        if let Some(updated) = resp.updates.and_then(|u| u.updated_range) {
            debug!(updated_range = %updated, "sheet updated");
        }
        Ok(())
    }
}
