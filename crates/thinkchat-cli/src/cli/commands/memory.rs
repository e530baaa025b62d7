//! Memory command handlers.

use anyhow::{Result, bail};
use thinkchat_core::personalization::Personalization;
use thinkchat_core::store::Store;

pub fn list(store: &Store) -> Result<()> {
    let personalization = Personalization::load(store.clone());
    let notes = personalization.memory();

    if notes.is_empty() {
        println!("No memory notes saved.");
        return Ok(());
    }

    for note in notes {
        println!("{}  {}", note.id, note.content);
    }
    if let Some(label) = personalization.profession().label() {
        println!("\nDetected profession: {label}");
    }
    Ok(())
}

pub fn add(store: &Store, note: &str) -> Result<()> {
    let mut personalization = Personalization::load(store.clone());
    match personalization.add_note(note)? {
        Some(id) => println!("Saved note {id}."),
        None => bail!("Note must not be empty"),
    }
    Ok(())
}

pub fn remove(store: &Store, id: &str) -> Result<()> {
    let mut personalization = Personalization::load(store.clone());
    if personalization.remove_note(id)? {
        println!("Removed note {id}.");
        Ok(())
    } else {
        bail!("No note with ID {id}")
    }
}

pub fn clear(store: &Store) -> Result<()> {
    let mut personalization = Personalization::load(store.clone());
    personalization.clear_all();
    println!("All personalization data cleared.");
    Ok(())
}
