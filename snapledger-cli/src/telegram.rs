//! Telegram transport: one pipeline run per inbound image, one reply per run.

use anyhow::Context;
use snapledger_core::{PipelineError, summary_header, summary_lines, unsaved_header};
use snapledger_ingest::{Delivered, Pipeline, reply_text};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use teloxide::net::Download;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, ParseMode};
use teloxide::utils::html;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::state::{ensure_dir, image_path};

/// Telegram rejects longer message texts.
const MAX_MESSAGE_CHARS: usize = 4096;
// room for the "…and N more" line
const TRUNCATION_RESERVE: usize = 32;

pub const USAGE: &str =
    "Send me a photo of a receipt or statement and I'll add the transactions to your spreadsheet.";

pub async fn run_bot(cfg: Arc<Config>, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let token = cfg
        .telegram
        .token
        .clone()
        .context("missing bot token; set TELEGRAM_BOT_TOKEN")?;
    ensure_dir(&cfg.storage.download_dir())?;

    let bot = Bot::new(token);
    let me = bot.get_me().await.context("telegram getMe (check the bot token)")?;
    info!(username = %me.username(), "bot is polling");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![cfg, pipeline])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    cfg: Arc<Config>,
    pipeline: Arc<Pipeline>,
) -> ResponseResult<()> {
    let Some((file, extension)) = inbound_image(&msg).map(|(f, ext)| (f.clone(), ext)) else {
        bot.send_message(msg.chat.id, USAGE).await?;
        return Ok(());
    };

    let span = info_span!("image", chat_id = msg.chat.id.0, file_id = ?file.id);
    async move {
        info!("image received");
        let outcome = process(&bot, &file, extension, &cfg, &pipeline).await;
        if let Err(e) = &outcome {
            error!(error = %e, "pipeline failed");
        }

        bot.send_message(msg.chat.id, render_reply(&outcome))
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
    .instrument(span)
    .await
}

/// The largest photo size, or a document sent with an `image/*` MIME type.
fn inbound_image(msg: &Message) -> Option<(&FileMeta, &'static str)> {
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some((&largest.file, "jpg"));
    }
    let doc = msg.document()?;
    let mime = doc.mime_type.as_ref()?;
    if mime.type_().as_str() != "image" {
        return None;
    }
    let ext = match mime.subtype().as_str() {
        "png" => "png",
        "webp" => "webp",
        "tiff" => "tiff",
        _ => "jpg",
    };
    Some((&doc.file, ext))
}

async fn process(
    bot: &Bot,
    file: &FileMeta,
    extension: &str,
    cfg: &Config,
    pipeline: &Pipeline,
) -> Result<Delivered, PipelineError> {
    let mut image = DownloadedImage::new(image_path(&cfg.storage.download_dir(), extension));
    download(bot, file, image.path())
        .await
        .map_err(PipelineError::Download)?;
    image.keep = cfg.storage.keep_images;

    pipeline.process_image(image.path()).await
}

/// Removes the image file on drop unless `keep` is set, including after a failed download.
struct DownloadedImage {
    path: PathBuf,
    keep: bool,
}

impl DownloadedImage {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadedImage {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not remove downloaded image");
            }
        }
    }
}

async fn download(bot: &Bot, file: &FileMeta, path: &Path) -> anyhow::Result<()> {
    let remote = bot.get_file(file.id.clone()).await.context("telegram getFile")?;
    let mut dst = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("create {}", path.display()))?;
    bot.download_file(&remote.path, &mut dst)
        .await
        .context("telegram file download")?;
    finish_write(dst, path).await?;
    info!(path = %path.display(), "downloaded image");
    Ok(())
}

/// Wait for tokio's pending background write so the OCR process sees the whole file.
async fn finish_write(mut dst: tokio::fs::File, path: &Path) -> anyhow::Result<()> {
    dst.flush()
        .await
        .with_context(|| format!("write {}", path.display()))
}

/// HTML rendering of the reply: bold header, one code span per record line.
///
/// Lines that would push the message past Telegram's limit are replaced by a
/// count, so every image still gets exactly one message.
pub fn render_reply(outcome: &Result<Delivered, PipelineError>) -> String {
    match outcome {
        Ok(d) if !d.records.is_empty() => {
            let n = d.records.len();
            let header = if d.saved { summary_header(n) } else { unsaved_header(n) };
            let lines = summary_lines(&d.records)
                .iter()
                .map(|line| html::code_inline(line))
                .collect();
            fit_message(html::bold(&html::escape(&header)), lines)
        }
        other => {
            let text = html::escape(&reply_text(other));
            let mut lines = text.lines().map(str::to_string);
            let first = lines.next().unwrap_or_default();
            fit_message(first, lines.collect())
        }
    }
}

fn fit_message(first: String, lines: Vec<String>) -> String {
    let budget = MAX_MESSAGE_CHARS - TRUNCATION_RESERVE;
    let total = lines.len();
    let mut len = first.chars().count();
    let mut out = first;

    for (i, line) in lines.into_iter().enumerate() {
        let line_len = line.chars().count() + 1;
        if len + line_len > budget {
            out.push_str(&format!("\n…and {} more", total - i));
            break;
        }
        out.push('\n');
        out.push_str(&line);
        len += line_len;
    }
    out
}
