//! File attachments for chat turns.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use base64::Engine;

/// Maximum number of attachments accepted per turn.
pub const MAX_ATTACHMENTS: usize = 5;

/// A file attached to a user message, carried base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: String,
}

impl Attachment {
    /// Loads a file from disk, sniffing its MIME type from content with an
    /// extension-based fallback.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is empty.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
        if bytes.is_empty() {
            bail!("Attachment is empty: {}", path.display());
        }

        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_type_for_extension(path).map(ToString::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();

        Ok(Self {
            file_name,
            mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }
}

/// Returns MIME type inferred from file extension for common formats.
fn mime_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        "txt" | "md" => Some("text/plain"),
        "json" => Some("application/json"),
        "csv" => Some("text/csv"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_sniffs_png_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pic.dat");
        // Minimal PNG magic followed by filler.
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 16]);
        fs::write(&path, &bytes).expect("write");

        let attachment = Attachment::load(&path).expect("load");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.file_name, "pic.dat");
        assert_eq!(
            base64::engine::general_purpose::STANDARD
                .decode(&attachment.data)
                .expect("valid base64"),
            bytes
        );
    }

    #[test]
    fn load_falls_back_to_extension_for_plain_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").expect("write");

        let attachment = Attachment::load(&path).expect("load");
        assert_eq!(attachment.mime_type, "text/plain");
    }

    #[test]
    fn empty_files_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").expect("write");

        assert!(Attachment::load(&path).is_err());
    }
}
