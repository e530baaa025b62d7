//! Settings command handlers.

use anyhow::{Result, bail};
use thinkchat_core::personalization::Personalization;
use thinkchat_core::store::Store;

pub fn show(store: &Store) -> Result<()> {
    let personalization = Personalization::load(store.clone());
    let settings = personalization.settings();

    println!("Tone:   {}", settings.tone);
    println!("Length: {}", settings.length);
    match personalization.profession().label() {
        Some(label) => println!("Detected profession: {label}"),
        None => println!("Detected profession: none"),
    }
    Ok(())
}

pub fn set(store: &Store, key: &str, value: &str) -> Result<()> {
    let mut personalization = Personalization::load(store.clone());

    match key.to_ascii_lowercase().as_str() {
        "tone" => {
            let tone = value.parse().map_err(anyhow::Error::msg)?;
            personalization.set_tone(tone)?;
            println!("Tone set to {tone}.");
        }
        "length" => {
            let length = value.parse().map_err(anyhow::Error::msg)?;
            personalization.set_length(length)?;
            println!("Length set to {length}.");
        }
        other => bail!("Unknown setting '{other}' (expected tone or length)"),
    }
    Ok(())
}
