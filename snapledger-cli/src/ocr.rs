//! OCR by shelling out to the `tesseract` CLI.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use snapledger_core::ExtractionError;
use snapledger_ingest::TextExtractor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

use crate::config::OcrSection;

pub struct TesseractOcr {
    command: PathBuf,
    lang: String,
    extra_args: Vec<String>,
}

impl TesseractOcr {
    /// Resolve the engine binary up front so a missing install fails at startup.
    pub fn new(cfg: &OcrSection) -> anyhow::Result<Self> {
        let command = which::which(&cfg.command).with_context(|| {
            format!(
                "OCR engine '{}' not found on PATH. Install tesseract (e.g. apt install tesseract-ocr) or set ocr.command",
                cfg.command
            )
        })?;
        Ok(Self {
            command,
            lang: cfg.lang.clone(),
            extra_args: cfg.extra_args.clone(),
        })
    }

    fn args(&self, image: &Path) -> Vec<String> {
        let mut args = vec![
            image.display().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.lang.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl TextExtractor for TesseractOcr {
    async fn extract_text(&self, image: &Path) -> Result<String, ExtractionError> {
        let args = self.args(image);
        debug!(command = %self.command.display(), ?args, "running OCR");

        let out = tokio::process::Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("spawning {}", self.command.display()))
            .map_err(ExtractionError::Engine)?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(ExtractionError::Engine(anyhow!(
                "{} exited with {}: {}",
                self.command.display(),
                out.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn engine(command: &str) -> TesseractOcr {
        TesseractOcr::new(&OcrSection {
            command: command.to_string(),
            lang: "eng".to_string(),
            extra_args: vec!["--psm".to_string(), "6".to_string()],
        })
        .unwrap()
    }

    #[test]
    fn test_missing_engine_is_reported() {
        let err = TesseractOcr::new(&OcrSection {
            command: "definitely-not-an-ocr-engine".to_string(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[tokio::test]
    async fn test_stdout_becomes_text() {
        // echo prints its arguments, standing in for the engine
        let text = engine("echo").extract_text(Path::new("receipt.png")).await.unwrap();
        assert_eq!(text.trim(), "receipt.png stdout -l eng --psm 6");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_engine_error() {
        let err = engine("false").extract_text(Path::new("receipt.png")).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Engine(_)));
        assert!(err.to_string().contains("exited with"));
    }
}
