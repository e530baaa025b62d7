//! Imagine command handler.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use thinkchat_core::config::Config;
use thinkchat_core::providers::gemini::{GeminiClient, GeminiConfig, GeneratedImage};
use thinkchat_core::store::Store;

pub struct ImagineRunOptions<'a> {
    pub prompt: &'a str,
    pub out: Option<&'a str>,
    pub model_override: Option<&'a str>,
    pub config: &'a Config,
    pub store: &'a Store,
}

pub async fn run(options: ImagineRunOptions<'_>) -> Result<()> {
    super::auth::require_verified(options.store)?;

    let model = options
        .model_override
        .unwrap_or(&options.config.image_model);

    let gemini_config = GeminiConfig::from_env(
        options.config.model.clone(),
        None,
        options.config.providers.gemini.effective_base_url(),
        options.config.providers.gemini.effective_api_key(),
    )?;

    let client = GeminiClient::new(gemini_config);
    let response = client
        .generate_image(model, options.prompt)
        .await
        .context("generate image")?;

    let Some(image) = response.images.first() else {
        if let Some(text) = response.text_parts.first() {
            bail!("Model returned no images. Model text: {text}");
        }
        bail!("Model returned no images");
    };

    let path = write_image(options.out, image)?;
    println!("{}", path.display());
    Ok(())
}

/// Writes an image to `out`, or to `thinkchat-<timestamp>.<ext>` in the
/// current directory when no path is given. Returns the path written.
pub fn write_image(out: Option<&str>, image: &GeneratedImage) -> Result<PathBuf> {
    let path = out
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(
            || {
                let ext = extension_for_mime_type(&image.mime_type);
                PathBuf::from(format!(
                    "thinkchat-{}.{ext}",
                    Utc::now().format("%Y%m%d-%H%M%S")
                ))
            },
            PathBuf::from,
        );

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    fs::write(&path, &image.data)
        .with_context(|| format!("write image to '{}'", path.display()))?;
    Ok(path)
}

fn extension_for_mime_type(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_image_respects_explicit_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("nested/pic.png");
        let image = GeneratedImage {
            mime_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        };

        let path = write_image(out.to_str(), &image).expect("write");
        assert_eq!(path, out);
        assert_eq!(fs::read(&path).expect("read"), vec![1, 2, 3]);
    }

    #[test]
    fn extensions_follow_mime_type() {
        assert_eq!(extension_for_mime_type("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime_type("image/png"), "png");
        assert_eq!(extension_for_mime_type("application/unknown"), "png");
    }
}
