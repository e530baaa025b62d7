//! Personalization profile: tone/length settings and free-text memory notes.
//!
//! A profession classification is derived from the memory notes and
//! recomputed on every change; first keyword match wins in fixed priority
//! order (student, then seller, then developer).

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{MEMORY_RECORD, SETTINGS_RECORD, Store};

/// Response tone preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Creative,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Creative => "creative",
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "creative" => Ok(Tone::Creative),
            other => Err(format!(
                "unknown tone '{other}' (expected professional, casual, or creative)"
            )),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response length preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Concise,
    #[default]
    Detailed,
}

impl ResponseLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseLength::Concise => "concise",
            ResponseLength::Detailed => "detailed",
        }
    }
}

impl FromStr for ResponseLength {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "concise" => Ok(ResponseLength::Concise),
            "detailed" => Ok(ResponseLength::Detailed),
            other => Err(format!(
                "unknown length '{other}' (expected concise or detailed)"
            )),
        }
    }
}

impl fmt::Display for ResponseLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted tone/length preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tone: Tone,
    pub length: ResponseLength,
}

/// One free-text memory note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryNote {
    pub id: String,
    pub content: String,
}

/// Profession derived from memory note text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profession {
    #[default]
    None,
    Student,
    Seller,
    Developer,
}

impl Profession {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Profession::None => None,
            Profession::Student => Some("student"),
            Profession::Seller => Some("seller"),
            Profession::Developer => Some("developer"),
        }
    }
}

/// Scans notes for profession keywords.
///
/// Notes are scanned in order; within a note the priority is fixed:
/// "student", then "seller", then the developer triggers ("developer",
/// "programmer", "engineer"). Matching is a case-insensitive substring scan.
pub fn classify_profession(notes: &[MemoryNote]) -> Profession {
    let lowered: Vec<String> = notes.iter().map(|n| n.content.to_lowercase()).collect();

    for text in &lowered {
        if text.contains("student") {
            return Profession::Student;
        }
        if text.contains("seller") {
            return Profession::Seller;
        }
        if text.contains("developer") || text.contains("programmer") || text.contains("engineer") {
            return Profession::Developer;
        }
    }
    Profession::None
}

/// Personalization context: settings plus ordered memory notes, persisted as
/// two independent records.
pub struct Personalization {
    settings: Settings,
    memory: Vec<MemoryNote>,
    store: Store,
}

impl Personalization {
    /// Loads both records (or defaults) from the store.
    pub fn load(store: Store) -> Self {
        let settings = store.load(SETTINGS_RECORD).unwrap_or_default();
        let memory = store.load(MEMORY_RECORD).unwrap_or_default();
        Self {
            settings,
            memory,
            store,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn memory(&self) -> &[MemoryNote] {
        &self.memory
    }

    /// Profession derived from the current notes.
    pub fn profession(&self) -> Profession {
        classify_profession(&self.memory)
    }

    /// Updates the tone preference.
    ///
    /// # Errors
    /// Returns an error if the settings cannot be persisted.
    pub fn set_tone(&mut self, tone: Tone) -> Result<()> {
        self.settings.tone = tone;
        self.store.save(SETTINGS_RECORD, &self.settings)
    }

    /// Updates the length preference.
    ///
    /// # Errors
    /// Returns an error if the settings cannot be persisted.
    pub fn set_length(&mut self, length: ResponseLength) -> Result<()> {
        self.settings.length = length;
        self.store.save(SETTINGS_RECORD, &self.settings)
    }

    /// Appends a memory note; blank content is ignored.
    ///
    /// Returns the new note's id when one was added.
    ///
    /// # Errors
    /// Returns an error if the notes cannot be persisted.
    pub fn add_note(&mut self, content: &str) -> Result<Option<String>> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let note = MemoryNote {
            id: Uuid::new_v4().to_string(),
            content: trimmed.to_string(),
        };
        let id = note.id.clone();
        self.memory.push(note);
        self.store.save(MEMORY_RECORD, &self.memory)?;
        Ok(Some(id))
    }

    /// Removes a note by id. Unknown ids are ignored.
    ///
    /// # Errors
    /// Returns an error if the notes cannot be persisted.
    pub fn remove_note(&mut self, id: &str) -> Result<bool> {
        let before = self.memory.len();
        self.memory.retain(|n| n.id != id);
        if self.memory.len() == before {
            return Ok(false);
        }
        self.store.save(MEMORY_RECORD, &self.memory)?;
        Ok(true)
    }

    /// Resets settings and notes and deletes both persisted records.
    pub fn clear_all(&mut self) {
        self.settings = Settings::default();
        self.memory.clear();
        self.store.remove(SETTINGS_RECORD);
        self.store.remove(MEMORY_RECORD);
    }
}

/// Builds the full system instruction sent with every chat request.
///
/// The base instruction is followed by a personalization block rendering
/// tone, length, and each memory note as a bulleted line, delimited by
/// literal markers.
pub fn build_system_instruction(
    base: &str,
    settings: Settings,
    memory: &[MemoryNote],
) -> String {
    let mut block = String::from("\n\n--- USER PERSONALIZATION & MEMORY ---\n");
    block.push_str(
        "This is private context for our conversation. Adhere to these settings to tailor your responses.\n",
    );
    block.push_str(&format!("Response Tone: {}\n", settings.tone));
    block.push_str(&format!("Response Length: {}\n", settings.length));

    if !memory.is_empty() {
        block.push_str("\nKey information to remember:\n");
        for note in memory {
            block.push_str(&format!("- {}\n", note.content));
        }
    }
    block.push_str("--- END OF PERSONALIZATION ---");

    format!("{base}{block}")
}
