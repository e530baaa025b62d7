//! Interactive chat command handler.

use std::io::{BufRead, IsTerminal, Read, Write};
use std::path::Path;

use anyhow::Result;
use thinkchat_core::chat::{Attachment, ChatMode, ChatSession, MAX_ATTACHMENTS, create_event_channel};
use thinkchat_core::config::Config;
use thinkchat_core::store::Store;

use super::exec;

pub async fn run(config: &Config, store: &Store) -> Result<()> {
    // If stdin is piped, run exec mode instead
    if !std::io::stdin().is_terminal() {
        let mut prompt = String::new();
        std::io::stdin().lock().read_to_string(&mut prompt)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            anyhow::bail!("No input provided via pipe");
        }
        return exec::run(exec::ExecRunOptions {
            prompt,
            mode: "chat",
            attachment_paths: &[],
            config,
            store,
        })
        .await;
    }

    super::auth::require_verified(store)?;

    let mut session = ChatSession::new(config.clone(), store.clone());
    let mut mode = ChatMode::Chat;
    let mut attachments: Vec<Attachment> = Vec::new();

    println!("ThinkChat ({}). Type /help for commands, /exit to quit.", config.model);

    let stdin = std::io::stdin();
    loop {
        print!("[{mode}]> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !handle_slash_command(command, &mut mode, &mut attachments) {
                break;
            }
            continue;
        }

        let (tx, rx) = create_event_channel();
        let renderer = exec::spawn_renderer_task(rx);
        let turn_attachments = std::mem::take(&mut attachments);
        let result = session.send(line, mode, &turn_attachments, tx).await;
        let _ = renderer.await;

        // Errors are already rendered to stderr; keep the session going.
        if result.is_err() {
            tracing::debug!("turn failed, conversation rolled back");
        }
    }

    Ok(())
}

/// Handles a `/command` line. Returns `false` when the loop should exit.
fn handle_slash_command(
    command: &str,
    mode: &mut ChatMode,
    attachments: &mut Vec<Attachment>,
) -> bool {
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .unwrap_or((command, ""));

    match name {
        "exit" | "quit" => return false,
        "mode" => match rest.trim().parse::<ChatMode>() {
            Ok(new_mode) => {
                *mode = new_mode;
                println!("Mode set to {mode}.");
            }
            Err(err) => eprintln!("{err:#}"),
        },
        "attach" => {
            let path = rest.trim();
            if path.is_empty() {
                eprintln!("Usage: /attach <PATH>");
            } else if attachments.len() >= MAX_ATTACHMENTS {
                eprintln!("Attachment limit reached ({MAX_ATTACHMENTS}).");
            } else {
                match Attachment::load(Path::new(path)) {
                    Ok(attachment) => {
                        println!("Attached {} ({}).", attachment.file_name, attachment.mime_type);
                        attachments.push(attachment);
                    }
                    Err(err) => eprintln!("{err:#}"),
                }
            }
        }
        "clear-attachments" => {
            attachments.clear();
            println!("Attachments cleared.");
        }
        "help" => {
            println!("/mode <chat|image|summarize>  switch turn mode");
            println!("/attach <PATH>                attach a file to the next turn (max {MAX_ATTACHMENTS})");
            println!("/clear-attachments            drop pending attachments");
            println!("/exit                         quit");
        }
        other => eprintln!("Unknown command: /{other}. Type /help."),
    }

    true
}
