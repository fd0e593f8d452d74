use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clipboard_rs::{common::RustImage, Clipboard, ClipboardContext, ContentFormat};

use ck_core::ports::ClipboardPort;

/// OS clipboard adapter over `clipboard-rs`.
///
/// `ClipboardContext` is not `Send`, so every call builds one inside a
/// blocking task instead of holding it across awaits. The cost per poll
/// is negligible next to the clipboard round-trip itself.
pub struct SystemClipboard;

fn map_clipboard_err<T>(
    result: std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>,
) -> Result<T> {
    result.map_err(|e| anyhow!(e))
}

fn with_context<T>(f: impl FnOnce(&mut ClipboardContext) -> Result<T>) -> Result<T> {
    let mut ctx = ClipboardContext::new().map_err(|e| anyhow!(e))?;
    f(&mut ctx)
}

#[async_trait]
impl ClipboardPort for SystemClipboard {
    async fn read_text(&self) -> Result<Option<String>> {
        tokio::task::spawn_blocking(|| {
            with_context(|ctx| {
                if !ctx.has(ContentFormat::Text) {
                    return Ok(None);
                }
                match ctx.get_text() {
                    Ok(text) => Ok(Some(text)),
                    // A format can disappear between has() and get().
                    Err(_) => Ok(None),
                }
            })
        })
        .await
        .context("join clipboard read")?
    }

    async fn read_image(&self) -> Result<Option<Vec<u8>>> {
        tokio::task::spawn_blocking(|| {
            with_context(|ctx| {
                if !ctx.has(ContentFormat::Image) {
                    return Ok(None);
                }
                let Ok(img) = ctx.get_image() else {
                    return Ok(None);
                };
                let png = img.to_png().map_err(|e| anyhow!(e))?;
                Ok(Some(png.get_bytes().to_vec()))
            })
        })
        .await
        .context("join clipboard read")?
    }

    async fn write_text(&self, text: String) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            with_context(move |ctx| map_clipboard_err(ctx.set_text(text)))
        })
        .await
        .context("join clipboard write")?
    }

    async fn write_image(&self, png_bytes: Vec<u8>) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            with_context(move |ctx| {
                let img = clipboard_rs::RustImageData::from_bytes(&png_bytes)
                    .map_err(|e| anyhow!(e))?;
                map_clipboard_err(ctx.set_image(img))
            })
        })
        .await
        .context("join clipboard write")?
    }
}
