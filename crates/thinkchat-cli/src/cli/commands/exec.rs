//! Exec command handler: single prompt, streamed reply.

use std::io::{Write, stderr, stdout};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use thinkchat_core::chat::{
    Attachment, ChatEvent, ChatEventRx, ChatMode, ChatSession, create_event_channel,
};
use thinkchat_core::config::Config;
use thinkchat_core::store::Store;
use tokio::task::JoinHandle;

use super::imagine;

pub struct ExecRunOptions<'a> {
    pub prompt: &'a str,
    pub mode: &'a str,
    pub attachment_paths: &'a [String],
    pub config: &'a Config,
    pub store: &'a Store,
}

pub async fn run(options: ExecRunOptions<'_>) -> Result<()> {
    super::auth::require_verified(options.store)?;

    let mode: ChatMode = options.mode.parse()?;
    let attachments = load_attachments(options.attachment_paths)?;

    let mut session = ChatSession::new(options.config.clone(), options.store.clone());

    let (tx, rx) = create_event_channel();
    let renderer = spawn_renderer_task(rx);

    let result = session.send(options.prompt, mode, &attachments, tx).await;

    // Wait for the renderer even on error, to flush error events.
    let _ = renderer.await;
    result.context("execute prompt")?;

    Ok(())
}

pub fn load_attachments(paths: &[String]) -> Result<Vec<Attachment>> {
    paths
        .iter()
        .map(|p| Attachment::load(Path::new(p)))
        .collect()
}

/// Spawns a task that writes chat events to stdout/stderr.
///
/// # Output contract
/// - `AssistantDelta` → stdout (streamed, final newline at the end)
/// - `ImageGenerated` → image written to disk, path on stdout
/// - `Error` → stderr
pub fn spawn_renderer_task(mut rx: ChatEventRx) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = stdout();
        let mut stderr = stderr();
        let mut needs_final_newline = false;

        while let Some(event) = rx.recv().await {
            match Arc::unwrap_or_clone(event) {
                ChatEvent::AssistantDelta { text } => {
                    if !text.is_empty() {
                        let _ = write!(stdout, "{text}");
                        let _ = stdout.flush();
                        needs_final_newline = true;
                    }
                }
                ChatEvent::ImageGenerated { image } => match imagine::write_image(None, &image) {
                    Ok(path) => {
                        let _ = writeln!(stdout, "{}", path.display());
                    }
                    Err(err) => {
                        let _ = writeln!(stderr, "Error writing image: {err:#}");
                    }
                },
                ChatEvent::Error {
                    kind,
                    message,
                    details,
                } => {
                    let _ = writeln!(stderr, "Error [{kind}]: {message}");
                    if let Some(detail_text) = details {
                        let _ = writeln!(stderr, "  Details: {detail_text}");
                    }
                }
                ChatEvent::TurnCompleted { .. } => {
                    if needs_final_newline {
                        let _ = writeln!(stdout);
                        let _ = stdout.flush();
                        needs_final_newline = false;
                    }
                }
                ChatEvent::TurnStarted | ChatEvent::AssistantCompleted { .. } => {}
            }
        }
    })
}
