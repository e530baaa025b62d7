//! Config command handlers.

use anyhow::{Context, Result};
use thinkchat_core::config::{Config, paths};

pub fn path() {
    println!("{}", paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    let created = Config::init()
        .with_context(|| format!("init config at {}", config_path.display()))?;
    if created {
        println!("Created config at {}", config_path.display());
    } else {
        println!("Config already exists at {}", config_path.display());
    }
    Ok(())
}

pub fn set_model(model: &str) -> Result<()> {
    let model = model.trim();
    if model.is_empty() {
        anyhow::bail!("Model name must not be empty");
    }
    Config::save_model(model).context("save model to config")?;
    println!("Default model set to {model}.");
    Ok(())
}
