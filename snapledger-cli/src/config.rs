use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{default_download_dir, ensure_snapledger_home, snapledger_home};

const REDACTED: &str = "***";

/// Effective configuration. Built once at startup, then shared read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramSection,
    pub llm: LlmSection,
    pub ocr: OcrSection,
    pub sink: SinkSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            other => bail!("unknown llm provider '{other}' (expected openai, anthropic or ollama)"),
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com",
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Ollama => "http://localhost:11434",
        }
    }

    fn key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    pub model: String,
    /// Defaults to the provider's public endpoint. Point at any compatible server.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: "gpt-4o".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl LlmSection {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Hosted endpoints need a key; self-hosted ones usually don't.
    pub fn requires_api_key(&self) -> bool {
        match self.provider {
            Provider::Anthropic => true,
            Provider::OpenAI => self.base_url() == Provider::OpenAI.default_base_url(),
            Provider::Ollama => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSection {
    pub command: String,
    pub lang: String,
    pub extra_args: Vec<String>,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            lang: "eng".to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    GoogleSheets,
    Csv,
}

impl SinkKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "google-sheets" | "gsheets" | "sheets" => Ok(SinkKind::GoogleSheets),
            "csv" => Ok(SinkKind::Csv),
            other => bail!("unknown sink '{other}' (expected google-sheets or csv)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    pub kind: SinkKind,
    pub sheet_id: Option<String>,
    pub range: String,
    /// RAW or USER_ENTERED
    pub value_input_option: String,
    /// Service-account key file
    pub credentials_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            kind: SinkKind::GoogleSheets,
            sheet_id: None,
            range: "Sheet1!A1".to_string(),
            value_input_option: "RAW".to_string(),
            credentials_path: PathBuf::from("creds.json"),
            csv_path: PathBuf::from("transactions.csv"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub download_dir: Option<PathBuf>,
    pub keep_images: bool,
}

impl StorageSection {
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(default_download_dir)
    }
}

impl Config {
    /// Overlay environment variables. `lookup` is `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = Some(v);
        }
        if let Some(v) = get("SNAPLEDGER_SINK") {
            self.sink.kind = SinkKind::from_name(&v)?;
        }
        if let Some(v) = get("GOOGLE_SHEET_ID") {
            self.sink.sheet_id = Some(v);
        }
        if let Some(v) = get("GOOGLE_SHEET_RANGE") {
            self.sink.range = v;
        }
        if let Some(v) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            self.sink.credentials_path = PathBuf::from(v);
        }
        if let Some(v) = get("SNAPLEDGER_CSV_PATH") {
            self.sink.csv_path = PathBuf::from(v);
        }
        if let Some(v) = get("SNAPLEDGER_LLM_PROVIDER") {
            self.llm.provider = Provider::from_name(&v)?;
        }
        if let Some(v) = get("SNAPLEDGER_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("SNAPLEDGER_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        // provider-specific key first, generic override last
        if let Some(v) = self.llm.provider.key_env().and_then(|name| get(name)) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("SNAPLEDGER_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("SNAPLEDGER_OCR_COMMAND") {
            self.ocr.command = v;
        }
        if let Some(v) = get("SNAPLEDGER_OCR_LANG") {
            self.ocr.lang = v;
        }
        Ok(())
    }

    /// Everything needed to extract records (OCR + inference).
    pub fn validate_extraction(&self) -> Result<()> {
        if self.llm.requires_api_key() && self.llm.api_key.is_none() {
            let hint = self.llm.provider.key_env().unwrap_or("SNAPLEDGER_LLM_API_KEY");
            bail!("missing API key for {:?}; set {hint} or llm.api_key", self.llm.provider);
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model is empty");
        }
        Ok(())
    }

    pub fn validate_sink(&self) -> Result<()> {
        match self.sink.kind {
            SinkKind::GoogleSheets => {
                if self.sink.sheet_id.is_none() {
                    bail!("missing spreadsheet id; set GOOGLE_SHEET_ID or sink.sheet_id");
                }
                if !self.sink.credentials_path.exists() {
                    bail!(
                        "service-account credentials not found at {} (set GOOGLE_APPLICATION_CREDENTIALS)",
                        self.sink.credentials_path.display()
                    );
                }
            }
            SinkKind::Csv => {}
        }
        Ok(())
    }

    pub fn validate_for_bot(&self) -> Result<()> {
        if self.telegram.token.is_none() {
            bail!("missing bot token; set TELEGRAM_BOT_TOKEN or telegram.token");
        }
        self.validate_extraction()?;
        self.validate_sink()
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Config {
        let mut c = self.clone();
        if c.telegram.token.is_some() {
            c.telegram.token = Some(REDACTED.to_string());
        }
        if c.llm.api_key.is_some() {
            c.llm.api_key = Some(REDACTED.to_string());
        }
        c
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(snapledger_home()?.join("config.toml"))
}

/// Load from `path` (or `~/.snapledger/config.toml`), then overlay the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut cfg = match path {
        Some(p) => read_config(p)?,
        None => {
            let p = config_path()?;
            if p.exists() { read_config(&p)? } else { Config::default() }
        }
    };
    cfg.apply_env(|name| std::env::var(name).ok())?;
    Ok(cfg)
}

fn read_config(p: &Path) -> Result<Config> {
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = ensure_snapledger_home()?.join("config.toml");
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Strip a `provider/` prefix from model aliases like `openai/gpt-4o`.
pub fn normalize_model(model: &str) -> &str {
    match model.split_once('/') {
        Some((prefix, rest)) if matches!(prefix, "openai" | "anthropic" | "ollama") => rest,
        _ => model,
    }
}
